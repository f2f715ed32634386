//! Diesel schema for status log persistence.

diesel::table! {
    /// Append-only status samples.
    status_samples (id) {
        /// Surrogate key.
        id -> Int8,
        /// Internal identifier of the sampled server.
        server_id -> Int8,
        /// Observed status, `On` or `Off`.
        #[max_length = 8]
        status -> Varchar,
        /// Observation time.
        sampled_at -> Timestamptz,
    }
}
