//! Diesel schema for server registry persistence.

diesel::table! {
    /// Registered servers.
    servers (id) {
        /// Registry-assigned internal identifier.
        id -> Int8,
        /// Unique external identifier.
        #[max_length = 255]
        server_id -> Varchar,
        /// Display name.
        #[max_length = 255]
        server_name -> Varchar,
        /// Status (`On`, `Off`).
        #[max_length = 8]
        status -> Varchar,
        /// Dotted-quad IPv4 address.
        #[max_length = 15]
        ipv4 -> Varchar,
        /// TCP port.
        port -> Int4,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
