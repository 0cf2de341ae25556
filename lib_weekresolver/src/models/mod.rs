/// The week code record returned by the service.
pub mod resolution;
