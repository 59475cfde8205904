//! opendata.swiss catalog client and CSV parsing.

use super::{ensure_success, join_url};
use crate::error::{ToolkitError, ToolkitResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

const SERVICE: &str = "opendata.swiss";

/// One CSV record keyed by trimmed header name.
pub type CsvRow = HashMap<String, String>;

/// Header variants seen across dataset releases.
pub const BFS_COLUMNS: &[&str] = &["BFS_NR", "bfs_nr", "gemeinde_bfs"];
pub const KANTON_COLUMNS: &[&str] = &["KANTON", "kanton"];
pub const NAME_COLUMNS: &[&str] = &["GEMEINDENAME", "gemeindename"];

#[derive(Debug, Deserialize)]
struct PackageShow {
    #[serde(default)]
    result: Option<Package>,
}

#[derive(Debug, Deserialize)]
struct Package {
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    /// Either a plain string or a per-language object.
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub url: String,
}

impl Resource {
    fn is_csv(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("csv"))
    }

    fn name_text(&self) -> String {
        match &self.name {
            Some(Value::String(s)) => s.to_lowercase(),
            Some(Value::Object(translations)) => translations
                .values()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
            _ => String::new(),
        }
    }

    fn name_matches(&self, hints: &[&str]) -> bool {
        let name = self.name_text();
        hints.iter().any(|hint| name.contains(hint))
    }
}

/// Pick the CSV resource of a package.
///
/// A CSV whose name contains one of `hints` wins; otherwise the first CSV.
pub fn select_csv_resource(resources: &[Resource], hints: &[&str]) -> Option<Resource> {
    resources
        .iter()
        .filter(|r| r.is_csv())
        .find(|r| r.name_matches(hints))
        .or_else(|| resources.iter().find(|r| r.is_csv()))
        .cloned()
}

/// Parse the resource list out of a `package_show` response.
pub fn parse_package_resources(body: &str) -> ToolkitResult<Vec<Resource>> {
    let parsed: PackageShow = serde_json::from_str(body)
        .map_err(|e| ToolkitError::upstream_parse(SERVICE, e.to_string()))?;
    Ok(parsed.result.map(|p| p.resources).unwrap_or_default())
}

/// Parse a `;`-delimited CSV with a header row.
///
/// Fields are trimmed; rows with fewer fields than the header are skipped.
pub fn parse_csv(text: &str) -> ToolkitResult<Vec<CsvRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() < headers.len() {
            continue;
        }
        rows.push(
            headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect(),
        );
    }
    Ok(rows)
}

/// First non-empty value among header variants.
pub fn field<'a>(row: &'a CsvRow, variants: &[&str]) -> Option<&'a str> {
    variants
        .iter()
        .filter_map(|name| row.get(*name))
        .map(String::as_str)
        .find(|v| !v.is_empty())
}

/// Leading decimal number of `raw`, reading `,` as the decimal separator.
///
/// `"12,5"` is 12.5 and `"4021abc"` is 4021; text without a leading number
/// yields `None`.
pub fn leading_number(raw: &str) -> Option<f64> {
    let text = raw.trim().replace(',', ".");
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in text.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    text[..end].trim_end_matches('.').parse().ok()
}

/// Leading integer of a field, e.g. `"4021"`, `"4021.0"` or `"4021abc"`.
/// Zero counts as absent.
pub fn int_field(row: &CsvRow, variants: &[&str]) -> Option<i64> {
    let parsed = leading_number(field(row, variants)?)?.trunc() as i64;
    (parsed != 0).then_some(parsed)
}

/// Numeric field; zero and values without a leading number count as absent.
pub fn number_field(row: &CsvRow, column: &str) -> Option<f64> {
    row.get(column)
        .and_then(|v| leading_number(v))
        .filter(|v| *v != 0.0 && v.is_finite())
}

#[derive(Clone)]
pub struct OpenDataClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenDataClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Look up a package and return its CSV resource.
    ///
    /// Fails with the domain error `No CSV resource found` when the package
    /// has none.
    pub async fn csv_resource(&self, package_id: &str, hints: &[&str]) -> ToolkitResult<Resource> {
        let response = self
            .http
            .get(join_url(&self.base_url, "api/3/action/package_show"))
            .query(&[("id", package_id)])
            .send()
            .await?;
        let body = ensure_success(SERVICE, response).await?.text().await?;
        let resources = parse_package_resources(&body)?;

        debug!(package_id, resources = resources.len(), "Package metadata fetched");
        select_csv_resource(&resources, hints)
            .ok_or_else(|| ToolkitError::not_found("No CSV resource found"))
    }

    pub async fn download_csv(&self, url: &str) -> ToolkitResult<Vec<CsvRow>> {
        let response = self.http.get(url).send().await?;
        let text = ensure_success(SERVICE, response).await?.text().await?;

        let rows = parse_csv(&text)?;
        info!(
            url,
            size = %humansize::format_size(text.len(), humansize::WINDOWS),
            rows = rows.len(),
            "CSV downloaded"
        );
        Ok(rows)
    }

    /// Fetch and parse the CSV resource of a package.
    pub async fn package_csv(&self, package_id: &str, hints: &[&str]) -> ToolkitResult<Vec<CsvRow>> {
        let resource = self.csv_resource(package_id, hints).await?;
        self.download_csv(&resource.url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(name: &str, format: &str, url: &str) -> Resource {
        Resource {
            name: Some(Value::from(name)),
            format: Some(format.to_string()),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_select_first_csv() {
        let resources = vec![
            resource("Dokumentation", "PDF", "a.pdf"),
            resource("Daten", "csv", "b.csv"),
            resource("Daten Gemeinden", "CSV", "c.csv"),
        ];
        assert_eq!(select_csv_resource(&resources, &[]).unwrap().url, "b.csv");
        assert_eq!(
            select_csv_resource(&resources, &["gemeinde", "municipal"]).unwrap().url,
            "c.csv"
        );
        assert!(select_csv_resource(&resources[..1], &[]).is_none());
    }

    #[test]
    fn test_parse_package_resources() {
        let body = r#"{"success": true, "result": {"resources": [
            {"name": {"de": "Solarpotenzial Gemeinden", "fr": "Potentiel communes"}, "format": "CSV", "url": "https://x/gemeinden.csv"},
            {"name": "Gebäude", "format": "CSV", "url": "https://x/data.csv"},
            {"format": "JSON", "url": "https://x/data.json"}
        ]}}"#;
        let resources = parse_package_resources(body).unwrap();
        assert_eq!(resources.len(), 3);
        assert!(resources[2].name.is_none());
        assert_eq!(
            select_csv_resource(&resources, &["gemeinde"]).unwrap().url,
            "https://x/gemeinden.csv"
        );
        assert!(parse_package_resources("<html>").is_err());
    }

    #[test]
    fn test_parse_csv() {
        let text = "BFS_NR; GEMEINDENAME ;KANTON;anteil_ev\n\
                    4021; Baden ;AG;4.2\n\
                    4022;Bellikon\n\
                    261;Dietikon;ZH;0\n";
        let rows = parse_csv(text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["GEMEINDENAME"], "Baden");
        assert_eq!(int_field(&rows[0], BFS_COLUMNS), Some(4021));
        assert_eq!(field(&rows[1], KANTON_COLUMNS), Some("ZH"));
        assert_eq!(number_field(&rows[0], "anteil_ev"), Some(4.2));
        assert_eq!(number_field(&rows[1], "anteil_ev"), None);
        assert_eq!(number_field(&rows[1], "missing"), None);
    }

    #[test]
    fn test_header_variants() {
        let rows = parse_csv("gemeinde_bfs;kanton\n4021.0;ag\n").unwrap();
        assert_eq!(int_field(&rows[0], BFS_COLUMNS), Some(4021));
        assert_eq!(field(&rows[0], KANTON_COLUMNS), Some("ag"));

        let rows = parse_csv("BFS_NR;bfs_nr\n;261\n").unwrap();
        assert_eq!(int_field(&rows[0], BFS_COLUMNS), Some(261));
    }

    #[test]
    fn test_lenient_numbers() {
        let rows = parse_csv("BFS_NR;anteil_ev;anteil_erneuerbar_heizen\n4021abc;12,5;n/a\n").unwrap();
        assert_eq!(int_field(&rows[0], BFS_COLUMNS), Some(4021));
        assert_eq!(number_field(&rows[0], "anteil_ev"), Some(12.5));
        assert_eq!(number_field(&rows[0], "anteil_erneuerbar_heizen"), None);
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number(" 38.0 "), Some(38.0));
        assert_eq!(leading_number("-1,25%"), Some(-1.25));
        assert_eq!(leading_number("1.2.3"), Some(1.2));
        assert_eq!(leading_number("7."), Some(7.0));
        assert_eq!(leading_number(".5"), Some(0.5));
        assert_eq!(leading_number("-"), None);
        assert_eq!(leading_number("abc"), None);
        assert_eq!(leading_number(""), None);
    }
}
