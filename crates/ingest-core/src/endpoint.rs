//! Region × record-kind -> URL/method/content-type table (`spec.md` §6).
//!
//! The SCD endpoint is deliberately the same as the event-import endpoint
//! in all three regions. `spec.md` §9 flags this as looking copy-pasted in
//! the source and defers judgment; we preserve it rather than "fixing" it —
//! see `DESIGN.md` Open Question #2.

use crate::record::RecordKind;
use crate::spec::Region;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Csv,
}

impl ContentType {
    pub fn header_value(self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Csv => "text/csv",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EndpointInfo {
    pub url: String,
    pub method: HttpMethod,
    pub content_type: ContentType,
}

fn region_subdomain(region: Region, variant: &str) -> String {
    match (region, variant) {
        (Region::Us, "api") => "api".to_string(),
        (Region::Eu, "api") => "api-eu".to_string(),
        (Region::In, "api") => "api-in".to_string(),
        (Region::Us, "data") => "data".to_string(),
        (Region::Eu, "data") => "data-eu".to_string(),
        (Region::In, "data") => "data-in".to_string(),
        (Region::Us, "bare") => "".to_string(),
        (Region::Eu, "bare") => "eu.".to_string(),
        (Region::In, "bare") => "in.".to_string(),
        _ => unreachable!("unhandled region/variant combination"),
    }
}

/// Resolve the URL/method/content-type triple for a (region, record kind)
/// pair. `table_id` is required (and only consulted) for `RecordKind::Table`.
pub fn resolve(region: Region, kind: RecordKind, table_id: Option<&str>) -> EndpointInfo {
    use RecordKind::*;
    match kind {
        Event | Scd | ExportImportEvents => EndpointInfo {
            url: format!("https://{}.mixpanel.com/import", region_subdomain(region, "api")),
            method: HttpMethod::Post,
            content_type: ContentType::Json,
        },
        User | ExportImportProfiles => EndpointInfo {
            url: format!("https://{}.mixpanel.com/engage", region_subdomain(region, "api")),
            method: HttpMethod::Post,
            content_type: ContentType::Json,
        },
        Group => EndpointInfo {
            url: format!("https://{}.mixpanel.com/groups", region_subdomain(region, "api")),
            method: HttpMethod::Post,
            content_type: ContentType::Json,
        },
        Table => EndpointInfo {
            url: format!(
                "https://{}.mixpanel.com/lookup-tables/{}",
                region_subdomain(region, "api"),
                table_id.unwrap_or_default()
            ),
            method: HttpMethod::Put,
            content_type: ContentType::Csv,
        },
        Export => EndpointInfo {
            url: format!(
                "https://{}.mixpanel.com/api/2.0/export",
                region_subdomain(region, "data")
            ),
            method: HttpMethod::Get,
            content_type: ContentType::Json,
        },
        ProfileExport => EndpointInfo {
            url: format!(
                "https://{}mixpanel.com/api/2.0/engage",
                region_subdomain(region, "bare")
            ),
            method: HttpMethod::Get,
            content_type: ContentType::Json,
        },
    }
}
