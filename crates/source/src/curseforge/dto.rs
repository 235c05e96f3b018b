//! Wire format of the CurseForge REST API.
//!
//! Every field is optional or defaulted: the API is loose about what it
//! includes, and a record that is missing something we need is skipped
//! rather than failing the whole page.

use crate::CatalogPage;
use modsync_extract::models::{CatalogEntry, FileHash, FileRecord, HashAlgorithm};
use serde::Deserialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Envelope of every list endpoint. Records stay as raw JSON so that one bad
/// record can be skipped on its own.
#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse {
    pub data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DownloadUrlResponse {
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct CfMod {
    pub id: u64,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub links: Option<CfLinks>,
    pub authors: Option<Vec<CfAuthor>>,
    pub latest_files: Option<Vec<CfFile>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct CfLinks {
    pub website_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CfAuthor {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct CfFile {
    pub id: u64,
    pub display_name: Option<String>,
    pub file_name: Option<String>,
    pub file_date: Option<String>,
    pub download_url: Option<String>,
    pub file_length: u64,
    pub hashes: Option<Vec<CfHash>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CfHash {
    pub value: String,
    pub algo: u32,
}

impl CfMod {
    /// Convert into a catalog entry. Only records that link to a mod page and
    /// carry a slug survive.
    pub fn into_entry(self) -> Option<CatalogEntry> {
        let url = self.links.and_then(|links| links.website_url).filter(|url| url.contains("/mods/"))?;
        let slug = self.slug.filter(|slug| !slug.trim().is_empty())?;
        let files = self.latest_files.unwrap_or_default().into_iter().map(CfFile::into_record).collect();
        let entry = CatalogEntry {
            mod_id: self.id,
            slug,
            name: self.name.unwrap_or_default(),
            url,
            authors: self.authors.unwrap_or_default().into_iter().map(|a| a.name.unwrap_or_default()).collect(),
            latest_version: None,
            files,
        };
        Some(entry.with_derived_version())
    }
}

impl CfFile {
    fn into_record(self) -> FileRecord {
        let file_date = self.file_date.as_deref().and_then(|date| match OffsetDateTime::parse(date, &Rfc3339) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::debug!(file_id = self.id, date, error = %err, "Ignoring unparseable file date");
                None
            },
        });
        let hashes = self
            .hashes
            .unwrap_or_default()
            .into_iter()
            .filter_map(|hash| {
                let algorithm = HashAlgorithm::from_code(hash.algo)?;
                FileHash::new(algorithm, &hash.value)
                    .inspect_err(|err| tracing::debug!(file_id = self.id, error = %err, "Ignoring unusable file hash"))
                    .ok()
            })
            .collect();
        FileRecord {
            file_id: self.id,
            display_name: self.display_name.unwrap_or_default(),
            file_name: self.file_name.unwrap_or_default(),
            file_date,
            download_url: self.download_url.filter(|url| !url.is_empty()),
            length: self.file_length,
            hashes,
        }
    }
}

/// Decode the records of a list response, skipping the ones that do not
/// decode or do not describe a mod.
pub(crate) fn decode_entries(response: ListResponse) -> Vec<CatalogEntry> {
    response
        .data
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<CfMod>(value) {
            Ok(record) => record.into_entry(),
            Err(err) => {
                tracing::debug!(error = %err, "Skipping undecodable catalog record");
                None
            },
        })
        .collect()
}

/// Decode a page of the full listing, remembering how many records the
/// upstream page held before filtering.
pub(crate) fn decode_page(response: ListResponse) -> CatalogPage {
    let raw_count = response.data.len();
    CatalogPage {
        entries: decode_entries(response),
        raw_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const SEARCH_PAGE: &str = r#"{
        "data": [
            {
                "id": 1001,
                "name": "Cool Sword",
                "slug": "cool-sword",
                "links": { "websiteUrl": "https://www.curseforge.com/hytale/mods/cool-sword" },
                "authors": [{ "name": "smith" }, { "name": null }],
                "latestFiles": [
                    {
                        "id": 1,
                        "displayName": "Cool Sword 1.0.0",
                        "fileName": "CoolSword-1.0.0.jar",
                        "fileDate": "2024-01-01T00:00:00Z",
                        "fileLength": 100,
                        "hashes": [{ "value": "86F7E437FAA5A7FCE15D1DDCB9EAEAEA377667B8", "algo": 1 }]
                    },
                    {
                        "id": 2,
                        "displayName": "Cool Sword v1.2.0",
                        "fileName": "CoolSword-1.2.0.jar",
                        "fileDate": "2024-03-05T10:20:30.123Z",
                        "downloadUrl": "https://edge.example/CoolSword-1.2.0.jar",
                        "fileLength": 120,
                        "hashes": [
                            { "value": "0cc175b9c0f1b6a831c399e269772661", "algo": 2 },
                            { "value": "whatever", "algo": 9 },
                            { "value": "short", "algo": 1 }
                        ]
                    }
                ]
            },
            {
                "id": 1002,
                "name": "A Modpack",
                "slug": "a-modpack",
                "links": { "websiteUrl": "https://www.curseforge.com/hytale/modpacks/a-modpack" }
            },
            { "id": "not-a-number" },
            {
                "id": 1003,
                "name": "No Slug",
                "links": { "websiteUrl": "https://www.curseforge.com/hytale/mods/no-slug" }
            }
        ]
    }"#;

    fn decode(json: &str) -> Vec<CatalogEntry> {
        decode_entries(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_decode_keeps_only_mods() {
        let entries = decode(SEARCH_PAGE);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.mod_id, 1001);
        assert_eq!(entry.slug, "cool-sword");
        assert_eq!(entry.name, "Cool Sword");
        assert_eq!(entry.authors, vec!["smith".to_string(), String::new()]);
    }

    #[test]
    fn test_decode_files() {
        let entry = decode(SEARCH_PAGE).remove(0);
        assert_eq!(entry.files.len(), 2);
        let first = &entry.files[0];
        assert_eq!(first.file_date, Some(datetime!(2024-01-01 0:00 UTC)));
        assert_eq!(first.hash(HashAlgorithm::Sha1), Some("86f7e437faa5a7fce15d1ddcb9eaeaea377667b8"));
        assert_eq!(first.download_url, None);
        let second = &entry.files[1];
        assert_eq!(second.length, 120);
        assert_eq!(second.hashes.len(), 1);
        assert_eq!(second.hash(HashAlgorithm::Md5), Some("0cc175b9c0f1b6a831c399e269772661"));
        assert_eq!(second.download_url.as_deref(), Some("https://edge.example/CoolSword-1.2.0.jar"));
    }

    #[test]
    fn test_decode_derives_latest_version() {
        let entry = decode(SEARCH_PAGE).remove(0);
        assert_eq!(entry.latest_version.as_deref(), Some("1.2.0"));
    }

    #[test]
    fn test_decode_bad_date_is_dropped() {
        let json = r#"{"data": [{
            "id": 5, "slug": "x", "links": {"websiteUrl": "https://host/mods/x"},
            "latestFiles": [{"id": 9, "fileDate": "yesterday", "fileName": "x.jar"}]
        }]}"#;
        let entry = decode(json).remove(0);
        assert_eq!(entry.files[0].file_date, None);
        assert_eq!(entry.latest_version, None);
    }

    #[test]
    fn test_page_of_non_mods_is_not_exhausted() {
        let json = r#"{"data": [
            {"id": 7, "slug": "big-pack", "links": {"websiteUrl": "https://www.curseforge.com/hytale/modpacks/big-pack"}},
            {"id": 8, "slug": "sky-world", "links": {"websiteUrl": "https://www.curseforge.com/hytale/worlds/sky-world"}}
        ]}"#;
        let page = decode_page(serde_json::from_str(json).unwrap());
        assert!(page.entries.is_empty());
        assert_eq!(page.raw_count, 2);
        assert!(!page.is_exhausted());

        let page = decode_page(serde_json::from_str(SEARCH_PAGE).unwrap());
        assert_eq!((page.entries.len(), page.raw_count), (1, 4));
        assert!(decode_page(serde_json::from_str(r#"{"data": []}"#).unwrap()).is_exhausted());
    }

    #[test]
    fn test_envelope_without_data_is_an_error() {
        assert!(serde_json::from_str::<ListResponse>(r#"{"error": "nope"}"#).is_err());
    }

    #[test]
    fn test_download_url_response() {
        let response: DownloadUrlResponse = serde_json::from_str(r#"{"data": "https://edge/x.jar"}"#).unwrap();
        assert_eq!(response.data.as_deref(), Some("https://edge/x.jar"));
        let response: DownloadUrlResponse = serde_json::from_str(r#"{"data": null}"#).unwrap();
        assert_eq!(response.data, None);
    }
}
