//! Validated search parameters for the server registry.
//!
//! Raw request parameters arrive as strings and integers. Everything here is
//! validated up front so that adapters only ever see well-formed ranges,
//! whitelisted sort columns, and a port filter that is either absent or a
//! real port.

use super::{ExternalId, InternalId, ServerDomainError, ServerStatus};
use std::fmt;
use std::net::Ipv4Addr;

/// Sentinel meaning "do not filter on port".
pub const UNFILTERED_PORT: i64 = -1;

/// Inclusive range over internal identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    from: InternalId,
    to: InternalId,
}

impl IdRange {
    /// Creates a validated inclusive range.
    ///
    /// # Errors
    ///
    /// Returns [`ServerDomainError::InvalidIdRange`] when either bound is
    /// negative or `from > to`.
    pub fn new(from: i64, to: i64) -> Result<Self, ServerDomainError> {
        let invalid = || ServerDomainError::InvalidIdRange { from, to };
        let lower = u64::try_from(from).map_err(|_| invalid())?;
        let upper = u64::try_from(to).map_err(|_| invalid())?;
        if lower > upper {
            return Err(invalid());
        }
        Ok(Self {
            from: InternalId::new(lower),
            to: InternalId::new(upper),
        })
    }

    /// Returns the inclusive lower bound.
    #[must_use]
    pub const fn from(&self) -> InternalId {
        self.from
    }

    /// Returns the inclusive upper bound.
    #[must_use]
    pub const fn to(&self) -> InternalId {
        self.to
    }

    /// Returns whether `id` falls inside the range.
    #[must_use]
    pub fn contains(&self, id: InternalId) -> bool {
        self.from <= id && id <= self.to
    }
}

/// Port filter where `-1` on the wire means unfiltered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortFilter(Option<u16>);

impl PortFilter {
    /// Filter that accepts every port.
    pub const ANY: Self = Self(None);

    /// Parses the request value, treating `-1` as unfiltered.
    ///
    /// # Errors
    ///
    /// Returns [`ServerDomainError::InvalidPortFilter`] for any value that is
    /// neither `-1` nor within `0..=65535`.
    pub fn from_request(value: i64) -> Result<Self, ServerDomainError> {
        if value == UNFILTERED_PORT {
            return Ok(Self::ANY);
        }
        u16::try_from(value)
            .map(|port| Self(Some(port)))
            .map_err(|_| ServerDomainError::InvalidPortFilter(value))
    }

    /// Filter matching exactly `port`.
    #[must_use]
    pub const fn exact(port: u16) -> Self {
        Self(Some(port))
    }

    /// Returns the port to match, if filtering.
    #[must_use]
    pub const fn port(self) -> Option<u16> {
        self.0
    }
}

/// Optional equality and substring filters; unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerFilter {
    /// Exact external identifier match.
    pub external_id: Option<ExternalId>,
    /// Case-sensitive substring of the display name.
    pub name_contains: Option<String>,
    /// Exact status match.
    pub status: Option<ServerStatus>,
    /// Exact IPv4 address match.
    pub address: Option<Ipv4Addr>,
    /// Port match.
    pub port: PortFilter,
}

impl ServerFilter {
    /// Builds a filter from raw request values.
    ///
    /// Empty strings leave the corresponding field unfiltered and a port of
    /// `-1` leaves the port unfiltered.
    ///
    /// # Errors
    ///
    /// Returns [`ServerDomainError`] when a non-empty value fails validation.
    pub fn from_request(
        external_id: &str,
        name: &str,
        status: &str,
        address: &str,
        port: i64,
    ) -> Result<Self, ServerDomainError> {
        let external_id_filter = non_empty(external_id).map(ExternalId::new).transpose()?;
        let status_filter = non_empty(status)
            .map(|value| {
                ServerStatus::try_from(value)
                    .map_err(|_| ServerDomainError::InvalidStatusFilter(value.to_owned()))
            })
            .transpose()?;
        let address_filter = non_empty(address)
            .map(|value| {
                value
                    .parse::<Ipv4Addr>()
                    .map_err(|_| ServerDomainError::InvalidAddress(value.to_owned()))
            })
            .transpose()?;

        Ok(Self {
            external_id: external_id_filter,
            name_contains: non_empty(name).map(str::to_owned),
            status: status_filter,
            address: address_filter,
            port: PortFilter::from_request(port)?,
        })
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Column used to order search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortColumn {
    /// Internal identifier.
    InternalId,
    /// External identifier.
    ExternalId,
    /// Display name.
    Name,
    /// Status.
    Status,
    /// IPv4 address.
    Address,
    /// Port.
    Port,
    /// Creation timestamp.
    CreatedAt,
    /// Last update timestamp.
    UpdatedAt,
}

impl SortColumn {
    /// Returns the storage column name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InternalId => "id",
            Self::ExternalId => "server_id",
            Self::Name => "server_name",
            Self::Status => "status",
            Self::Address => "ipv4",
            Self::Port => "port",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SortColumn {
    type Error = ServerDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(Self::InternalId),
            "server_id" => Ok(Self::ExternalId),
            "server_name" => Ok(Self::Name),
            "status" => Ok(Self::Status),
            "ipv4" => Ok(Self::Address),
            "port" => Ok(Self::Port),
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            _ => Err(ServerDomainError::UnsupportedSortColumn(value.to_owned())),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortOrder {
    /// Returns the canonical request representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl TryFrom<&str> for SortOrder {
    type Error = ServerDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ServerDomainError::UnsupportedSortOrder(value.to_owned())),
        }
    }
}

/// Complete registry search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerQuery {
    /// Field filters, combined with AND.
    pub filter: ServerFilter,
    /// Mandatory internal identifier range.
    pub range: IdRange,
    /// Mandatory sort column.
    pub sort_column: SortColumn,
    /// Sort direction.
    pub sort_order: SortOrder,
}

impl ServerQuery {
    /// Creates an unfiltered query over `range`.
    #[must_use]
    pub fn new(range: IdRange, sort_column: SortColumn, sort_order: SortOrder) -> Self {
        Self {
            filter: ServerFilter::default(),
            range,
            sort_column,
            sort_order,
        }
    }

    /// Replaces the field filters.
    #[must_use]
    pub fn with_filter(mut self, filter: ServerFilter) -> Self {
        self.filter = filter;
        self
    }
}
