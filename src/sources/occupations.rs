//! Occupation-code scrapers for the government classification pages.
//!
//! Each site is a single page of HTML tables, no pagination. The skill-list
//! layout carries four columns including the assessing authority; the ABS
//! classification layout carries only code and title, with the skill level
//! encoded as the code's leading digit.

use scraper::{ElementRef, Html};
use tracing::{debug, error, info};

use super::{open_collection, RunSummary};
use crate::config::HarvestConfig;
use crate::extract::{css, element_text};
use crate::models::{OccupationRecord, Record};
use crate::scrapers::{HttpClient, ProxyRotator, RateGate};
use crate::sink::{merge_occupation_snapshot, save_records, DocumentStore, SinkMode};

pub const COLLECTION: &str = "occupations";

/// Table layout a site publishes its occupations in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    /// Code, title, skill level, assessing authority.
    SkillList,
    /// Code and title only; skill level derived from the code.
    Classification,
}

/// One occupation publication to scrape.
pub struct OccupationSite {
    /// Short name used in snapshot filenames.
    pub name: &'static str,
    pub url: &'static str,
    /// Issuing agency recorded as the record's source tag.
    pub agency: &'static str,
    pub layout: TableLayout,
}

/// The publications harvested by default.
pub fn default_sites() -> Vec<OccupationSite> {
    vec![
        OccupationSite {
            name: "immi",
            url: "https://immi.homeaffairs.gov.au/visas/working-in-australia/skill-occupation-list",
            agency: "Department of Home Affairs",
            layout: TableLayout::SkillList,
        },
        OccupationSite {
            name: "abs",
            url: "https://www.abs.gov.au/statistics/classifications/anzsco-australian-and-new-zealand-standard-classification-occupations/2022/concordance-tables/anzsco-2022-structure",
            agency: "Australian Bureau of Statistics",
            layout: TableLayout::Classification,
        },
        OccupationSite {
            name: "abs_concordance",
            url: "https://www.abs.gov.au/statistics/classifications/anzsco-australian-and-new-zealand-standard-classification-occupations/2022/concordance-tables/concordance-tables",
            agency: "Australian Bureau of Statistics",
            layout: TableLayout::Classification,
        },
    ]
}

/// Parse a skill-list page: `table.table` tables, four or more cells per
/// data row. Rows without both a code and a title are skipped.
pub fn parse_skill_list(body: &str, agency: &str) -> Vec<OccupationRecord> {
    let document = Html::parse_document(body);
    let table_sel = css("table.table");
    let mut occupations = Vec::new();

    for table in document.select(&table_sel) {
        for cells in data_rows(&table) {
            if cells.len() < 4 {
                continue;
            }
            let code = cells[0].trim();
            let title = cells[1].trim();
            if code.is_empty() || title.is_empty() {
                continue;
            }
            let mut occupation =
                OccupationRecord::new(code.to_string(), title.to_string(), agency);
            occupation.skill_level = non_empty(&cells[2]);
            occupation.assessing_authority = non_empty(&cells[3]);
            debug!("Found occupation: {} - {}", code, title);
            occupations.push(occupation);
        }
    }

    occupations
}

/// Parse an ABS classification page: any table, two or more cells per data
/// row, skill level taken from the code's first digit when numeric.
pub fn parse_classification(body: &str, agency: &str) -> Vec<OccupationRecord> {
    let document = Html::parse_document(body);
    let table_sel = css("table");
    let mut occupations = Vec::new();

    for table in document.select(&table_sel) {
        for cells in data_rows(&table) {
            if cells.len() < 2 {
                continue;
            }
            let code = cells[0].trim();
            let title = cells[1].trim();
            if code.is_empty() || title.is_empty() {
                continue;
            }
            let mut occupation =
                OccupationRecord::new(code.to_string(), title.to_string(), agency);
            occupation.skill_level = code
                .chars()
                .next()
                .filter(char::is_ascii_digit)
                .map(String::from);
            debug!("Found occupation: {} - {}", code, title);
            occupations.push(occupation);
        }
    }

    occupations
}

/// Cell texts for every row after the header row.
fn data_rows(table: &ElementRef) -> Vec<Vec<String>> {
    let row_sel = css("tr");
    let cell_sel = css("td");
    table
        .select(&row_sel)
        .skip(1)
        .map(|row| {
            row.select(&cell_sel)
                .map(|cell| element_text(&cell).unwrap_or_default())
                .collect()
        })
        .collect()
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Harvest every occupation site: merge per-site snapshots, upsert the
/// combined set by code, and index the lookup fields.
pub async fn harvest(config: &HarvestConfig) -> anyhow::Result<RunSummary> {
    let proxies = ProxyRotator::from_config(&config.proxy);
    let client =
        HttpClient::new(&config.fetch, proxies).with_rate_gate(RateGate::per_second(1.0));

    let mut all: Vec<OccupationRecord> = Vec::new();
    let mut pages = 0;

    for site in default_sites() {
        info!("Starting to scrape {} from {}", site.name, site.url);
        let body = match client.fetch(site.url).await {
            Ok(body) => body,
            Err(err) => {
                error!("Error processing {}: {}", site.name, err);
                continue;
            }
        };
        pages += 1;

        let records = match site.layout {
            TableLayout::SkillList => parse_skill_list(&body, site.agency),
            TableLayout::Classification => parse_classification(&body, site.agency),
        };
        info!("Found {} occupations on {}", records.len(), site.name);

        let path = config
            .output_dir
            .join(format!("occupations_{}.json", site.name));
        if let Err(err) = merge_occupation_snapshot(&path, site.name, &records) {
            error!("Failed to save occupations for {}: {}", site.name, err);
        }
        all.extend(records);
    }

    let records: Vec<Record> = all.into_iter().map(Record::from).collect();
    let saved = match open_collection(config, COLLECTION) {
        Some(collection) => {
            let saved = save_records(&collection, &records, SinkMode::Upsert);
            for field in ["code", "title"] {
                if let Err(err) = collection.create_index(field) {
                    error!("Failed to create index on {}: {}", field, err);
                }
            }
            saved
        }
        None => 0,
    };

    let summary = RunSummary {
        source: COLLECTION.to_string(),
        pages,
        found: records.len(),
        saved,
        snapshot: None,
    };
    info!("{}", summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKILL_LIST: &str = r#"
        <table class="table">
          <tr><th>Code</th><th>Title</th><th>Skill level</th><th>Assessing authority</th></tr>
          <tr><td>261313</td><td>Software Engineer</td><td>1</td><td>ACS</td></tr>
          <tr><td>233211</td><td>Civil Engineer</td><td>1</td><td>Engineers Australia</td></tr>
          <tr><td></td><td>Missing code row</td><td>1</td><td>N/A</td></tr>
          <tr><td>999999</td><td>Sparse Row</td></tr>
        </table>
        <table><tr><th>x</th></tr><tr><td>not</td><td>a skill table</td></tr></table>
    "#;

    #[test]
    fn test_parse_skill_list() {
        let occupations = parse_skill_list(SKILL_LIST, "Department of Home Affairs");
        assert_eq!(occupations.len(), 2);
        assert_eq!(occupations[0].code, "261313");
        assert_eq!(occupations[0].title, "Software Engineer");
        assert_eq!(occupations[0].skill_level.as_deref(), Some("1"));
        assert_eq!(occupations[0].assessing_authority.as_deref(), Some("ACS"));
        assert_eq!(occupations[0].source, "Department of Home Affairs");
    }

    #[test]
    fn test_skill_list_skips_incomplete_rows() {
        let occupations = parse_skill_list(SKILL_LIST, "Department of Home Affairs");
        assert!(occupations.iter().all(|o| !o.code.is_empty()));
        assert!(occupations.iter().all(|o| o.code != "999999"));
    }

    const CLASSIFICATION: &str = r#"
        <table>
          <tr><th>Code</th><th>Title</th></tr>
          <tr><td>2613</td><td>Software and Applications Programmers</td></tr>
          <tr><td>MAJOR</td><td>Group heading</td></tr>
        </table>
    "#;

    #[test]
    fn test_parse_classification_derives_skill_level() {
        let occupations = parse_classification(CLASSIFICATION, "Australian Bureau of Statistics");
        assert_eq!(occupations.len(), 2);
        assert_eq!(occupations[0].skill_level.as_deref(), Some("2"));
        // Non-numeric codes carry no derived skill level.
        assert_eq!(occupations[1].code, "MAJOR");
        assert!(occupations[1].skill_level.is_none());
        assert!(occupations[1].assessing_authority.is_none());
    }

    #[test]
    fn test_tableless_page_yields_nothing() {
        assert!(parse_skill_list("<html><body><p>maintenance</p></body></html>", "x").is_empty());
        assert!(parse_classification("<html><body></body></html>", "x").is_empty());
    }
}
