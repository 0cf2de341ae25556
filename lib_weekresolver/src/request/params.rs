use chrono::NaiveDate;

use crate::error::ConnectorError;

/// Route prefix of the week resolver lookup endpoint.
pub const WEEKRESOLVER_ROUTE: &str = "api/v1/date";

/// Format used for the date segment of the route.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A validated lookup: catalogue code plus calendar date.
///
/// The catalogue code is kept exactly as given. Upper-casing is done by the
/// service, which echoes the normalized code back in the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    catalogue_code: String,
    date: NaiveDate,
}

impl ResolutionRequest {
    /// Validates the catalogue code and pairs it with `date`.
    ///
    /// The code must be non-blank and free of `/`, `?`, `#`, `%`, whitespace
    /// and control characters. This is stricter than the service, which only
    /// needs a non-empty code: such codes are rejected with `InvalidArgument`
    /// rather than percent-encoded, so the route segment is always the code
    /// exactly as given.
    pub fn new(catalogue_code: impl Into<String>, date: NaiveDate) -> Result<Self, ConnectorError> {
        let catalogue_code = catalogue_code.into();
        validate_catalogue_code(&catalogue_code)?;
        Ok(Self {
            catalogue_code,
            date,
        })
    }

    /// Starts an empty builder. Both fields must be set before `build`.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// The catalogue code as supplied by the caller.
    pub fn catalogue_code(&self) -> &str {
        &self.catalogue_code
    }

    /// The date to resolve.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Relative route, e.g. `api/v1/date/DPF/2019-10-10`.
    pub fn path(&self) -> String {
        format!(
            "{}/{}/{}",
            WEEKRESOLVER_ROUTE,
            self.catalogue_code,
            self.date.format(DATE_FORMAT)
        )
    }
}

/// Step-wise construction of a `ResolutionRequest`.
///
/// Mirrors call sites that collect the catalogue code and the date
/// separately. A missing field is reported as `InvalidArgument` by `build`.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    catalogue_code: Option<String>,
    date: Option<NaiveDate>,
}

impl RequestBuilder {
    /// Sets the catalogue code.
    pub fn catalogue_code(mut self, catalogue_code: impl Into<String>) -> Self {
        self.catalogue_code = Some(catalogue_code.into());
        self
    }

    /// Sets the date.
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Validates both fields and produces the request.
    pub fn build(self) -> Result<ResolutionRequest, ConnectorError> {
        let catalogue_code = self
            .catalogue_code
            .ok_or_else(|| ConnectorError::InvalidArgument("catalogueCode is required".into()))?;
        let date = self
            .date
            .ok_or_else(|| ConnectorError::InvalidArgument("date is required".into()))?;
        ResolutionRequest::new(catalogue_code, date)
    }
}

/// Validates the input and returns the relative route for it.
///
/// Applies the same catalogue code rules as `ResolutionRequest::new`.
pub fn build_path(catalogue_code: &str, date: NaiveDate) -> Result<String, ConnectorError> {
    Ok(ResolutionRequest::new(catalogue_code, date)?.path())
}

// The code becomes a single path segment, so separators cannot be let through.
fn validate_catalogue_code(catalogue_code: &str) -> Result<(), ConnectorError> {
    if catalogue_code.trim().is_empty() {
        return Err(ConnectorError::InvalidArgument(
            "catalogueCode must not be empty".into(),
        ));
    }
    if let Some(bad) = catalogue_code
        .chars()
        .find(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace() || c.is_control())
    {
        return Err(ConnectorError::InvalidArgument(format!(
            "catalogueCode contains illegal character {:?}",
            bad
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn path_has_route_code_and_iso_date() {
        let path = build_path("DPF", date(2019, 10, 10)).unwrap();
        assert_eq!(path, "api/v1/date/DPF/2019-10-10");
    }

    #[test]
    fn case_is_preserved() {
        let path = build_path("dpf", date(2019, 12, 31)).unwrap();
        assert_eq!(path, "api/v1/date/dpf/2019-12-31");
    }

    #[test]
    fn single_digit_month_and_day_are_padded() {
        let path = build_path("BKM", date(2023, 1, 2)).unwrap();
        assert_eq!(path, "api/v1/date/BKM/2023-01-02");
    }

    #[test]
    fn empty_or_blank_code_is_rejected() {
        for code in ["", "   "] {
            let err = build_path(code, date(2019, 10, 10)).unwrap_err();
            assert!(matches!(err, ConnectorError::InvalidArgument(_)), "{code:?}");
        }
    }

    #[test]
    fn code_with_path_separator_is_rejected() {
        let err = build_path("DPF/../x", date(2019, 10, 10)).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidArgument(_)));
    }

    #[test]
    fn code_with_query_fragment_or_escape_characters_is_rejected() {
        for code in ["DPF?x=1", "DPF#43", "DP%2F", "D PF", "DPF\t", "DPF\u{7}"] {
            let err = build_path(code, date(2019, 10, 10)).unwrap_err();
            assert!(
                matches!(err, ConnectorError::InvalidArgument(ref m) if m.contains("illegal character")),
                "{code:?}"
            );
        }
    }

    #[test]
    fn code_with_dashes_and_digits_is_accepted() {
        let path = build_path("DPF-2_x9", date(2019, 10, 10)).unwrap();
        assert_eq!(path, "api/v1/date/DPF-2_x9/2019-10-10");
    }

    #[test]
    fn builder_requires_both_fields() {
        let err = ResolutionRequest::builder().date(date(2019, 10, 10)).build().unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidArgument(ref m) if m.contains("catalogueCode")));

        let err = ResolutionRequest::builder().catalogue_code("DPF").build().unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidArgument(ref m) if m.contains("date")));

        let err = ResolutionRequest::builder().build().unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidArgument(_)));
    }

    #[test]
    fn builder_produces_same_path_as_free_function() {
        let request = ResolutionRequest::builder()
            .catalogue_code("BKM")
            .date(date(2023, 6, 16))
            .build()
            .unwrap();
        assert_eq!(request.catalogue_code(), "BKM");
        assert_eq!(request.date(), date(2023, 6, 16));
        assert_eq!(request.path(), build_path("BKM", date(2023, 6, 16)).unwrap());
    }
}
