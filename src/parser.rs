// 🏗️ Registry Parser
// IEEE oui.txt → flat OuiRecord table
//
// Source layout (tab separated, blank lines between entries):
//
//   OUI/MA-L                                  Organization
//   company_id                                Organization
//                                             Address
//
//   28-6F-B9   (hex)        Nokia Shanghai Bell Co., Ltd.
//   286FB9     (base 16)    Nokia Shanghai Bell Co., Ltd.
//                           No.388 Ning Qiao Road,Jin Qiao Pudong Shanghai
//                           Shanghai   201206
//                           CN

use crate::db::OuiRecord;
use crate::error::{MacvenError, Result};
use crate::normalizer::OuiPrefix;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ============================================================================
// REPORT TYPES
// ============================================================================

/// A registry row that could not be understood and was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseAnomaly {
    /// 1-based line number in the registry text
    pub line: usize,
    pub reason: String,
}

/// Output of a parse: records plus everything that was left out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub records: Vec<OuiRecord>,
    pub anomalies: Vec<ParseAnomaly>,
    /// Header rows repeating a prefix already registered (the `(base 16)` twin)
    pub duplicates: usize,
    /// Records dropped because they had no vendor name
    pub discarded: usize,
}

impl ParseReport {
    pub fn anomaly_count(&self) -> usize {
        self.anomalies.len()
    }
}

// ============================================================================
// ROW CLASSIFICATION
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
enum Row<'a> {
    Blank,
    /// `AC-DE-48   (hex)<TAB><TAB>Vendor`
    Header {
        key: &'a str,
        kind: &'a str,
        vendor: Option<String>,
    },
    /// `<TAB><TAB><TAB><TAB>one address line`
    Continuation(&'a str),
    Malformed(String),
}

fn classify(line: &str) -> Row<'_> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return Row::Blank;
    }

    let first_raw = line.split('\t').next().unwrap_or("");
    let fields: Vec<&str> = line
        .split('\t')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();

    if first_raw.trim().is_empty() {
        return match fields.as_slice() {
            [text] => Row::Continuation(text),
            _ => Row::Malformed(format!(
                "continuation row with {} columns",
                fields.len()
            )),
        };
    }

    let first = fields[0];
    let Some(open) = first.find('(') else {
        return Row::Malformed("missing type annotation in first column".to_string());
    };
    let Some(kind) = first[open + 1..].trim().strip_suffix(')') else {
        return Row::Malformed("unterminated type annotation".to_string());
    };

    let vendor = if fields.len() > 1 {
        Some(fields[1..].join(" "))
    } else {
        None
    };

    Row::Header {
        key: first[..open].trim(),
        kind: kind.trim(),
        vendor,
    }
}

/// `AC-DE-48` / `ACDE48` → canonical prefix
fn prefix_from_key(key: &str) -> Option<OuiPrefix> {
    let hex: String = key
        .chars()
        .filter(|c| !matches!(c, '-' | ':' | '.') && !c.is_whitespace())
        .collect();
    OuiPrefix::from_hex(&hex)
}

// ============================================================================
// PARSER
// ============================================================================

/// Single forward pass over the registry text
///
/// Address lines belong to the header rows that precede them. Consecutive
/// headers for the same prefix (`(hex)` then `(base 16)`) collapse into one
/// record; a header for a new prefix closes any pending record that never got
/// address lines.
#[derive(Debug, Default, Clone)]
pub struct RegistryParser;

impl RegistryParser {
    pub fn new() -> Self {
        RegistryParser
    }

    /// Parser version (logged with each refresh)
    pub fn version(&self) -> &str {
        "1.0.0"
    }

    /// Parse a staged registry file
    pub fn parse_file(&self, path: &Path) -> Result<ParseReport> {
        let bytes = std::fs::read(path).map_err(|e| MacvenError::io(path, e))?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(self.parse_str(&text))
    }

    /// Parse registry text; never fails, problems land in the report
    pub fn parse_str(&self, text: &str) -> ParseReport {
        let mut report = ParseReport::default();
        let mut seen: HashSet<OuiPrefix> = HashSet::new();

        let mut address = String::new();
        let mut in_block = false;
        let mut pending: Vec<usize> = Vec::new();
        let mut in_preamble = true;

        // Line 1 is the column header
        for (idx, line) in text.lines().enumerate().skip(1) {
            let line_no = idx + 1;

            match classify(line) {
                Row::Blank => {}
                Row::Continuation(text) => {
                    if in_preamble {
                        continue;
                    }
                    if !address.is_empty() {
                        address.push(' ');
                    }
                    address.push_str(text);
                    in_block = true;
                }
                Row::Header { key, kind, vendor } => {
                    in_preamble = false;

                    if in_block {
                        assign_address(&mut report.records, &pending, &address);
                        address.clear();
                        pending.clear();
                        in_block = false;
                    }

                    let Some(prefix) = prefix_from_key(key) else {
                        // Its address lines belong to nobody
                        pending.clear();
                        report.anomalies.push(ParseAnomaly {
                            line: line_no,
                            reason: format!("'{}' is not a 6-digit hex prefix", key),
                        });
                        continue;
                    };

                    if !seen.insert(prefix.clone()) {
                        report.duplicates += 1;
                        // Only the (base 16) twin of the open record shares its address
                        let twin = pending
                            .last()
                            .and_then(|&idx| report.records.get(idx))
                            .is_some_and(|r| r.prefix == prefix);
                        if !twin {
                            pending.clear();
                        }
                        continue;
                    }

                    // New prefix: whatever is still pending has no address
                    pending.clear();
                    report.records.push(OuiRecord {
                        prefix,
                        vendor_name: vendor.unwrap_or_default(),
                        vendor_type: Some(kind.to_string()).filter(|k| !k.is_empty()),
                        address: None,
                    });
                    pending.push(report.records.len() - 1);
                }
                Row::Malformed(reason) => {
                    if in_preamble {
                        continue;
                    }
                    tracing::debug!(line = line_no, %reason, "skipping registry row");
                    report.anomalies.push(ParseAnomaly {
                        line: line_no,
                        reason,
                    });
                }
            }
        }

        if in_block {
            assign_address(&mut report.records, &pending, &address);
        }

        let before = report.records.len();
        report
            .records
            .retain(|r| !r.vendor_name.trim().is_empty());
        report.discarded = before - report.records.len();

        if !report.anomalies.is_empty() {
            tracing::warn!(
                anomalies = report.anomalies.len(),
                "registry contained rows that were skipped"
            );
        }
        tracing::info!(
            records = report.records.len(),
            duplicates = report.duplicates,
            discarded = report.discarded,
            "registry parsed"
        );

        report
    }
}

fn assign_address(records: &mut [OuiRecord], pending: &[usize], address: &str) {
    for &idx in pending {
        if let Some(record) = records.get_mut(idx) {
            record.address = Some(address.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "OUI/MA-L\t\t\tOrganization\n\
                          company_id\t\t\tOrganization\n\
                          \t\t\t\tAddress\n\n";

    fn parse(body: &str) -> ParseReport {
        RegistryParser::new().parse_str(&format!("{}{}", HEADER, body))
    }

    #[test]
    fn test_header_with_address_and_next_header() {
        let report = parse(
            "AC-DE-48   (hex)\tTest Vendor\n\
             \t\t\t\t123 Main St\n\
             00-11-22   (hex)\tOther Vendor\n",
        );

        assert_eq!(report.records.len(), 2);
        assert_eq!(
            report.records[0],
            OuiRecord {
                prefix: OuiPrefix::from_hex("ACDE48").unwrap(),
                vendor_name: "Test Vendor".to_string(),
                vendor_type: Some("hex".to_string()),
                address: Some("123 Main St".to_string()),
            }
        );
        assert_eq!(report.records[1].address, None);
        assert!(report.anomalies.is_empty());
    }

    #[test]
    fn test_real_registry_entry() {
        let report = parse(
            "28-6F-B9   (hex)\t\tNokia Shanghai Bell Co., Ltd.\n\
             286FB9     (base 16)\t\tNokia Shanghai Bell Co., Ltd.\n\
             \t\t\t\tNo.388 Ning Qiao Road,Jin Qiao Pudong Shanghai\n\
             \t\t\t\tShanghai   201206\n\
             \t\t\t\tCN\n\
             \n\
             08-EA-44   (hex)\t\tExtreme Networks Headquarters\n\
             08EA44     (base 16)\t\tExtreme Networks Headquarters\n\
             \t\t\t\t2121 RDU Center Drive\n\
             \t\t\t\tMorrisville  NC  27560\n\
             \t\t\t\tUS\n",
        );

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.duplicates, 2);

        let nokia = &report.records[0];
        assert_eq!(nokia.prefix.as_str(), "286FB9");
        assert_eq!(nokia.vendor_type.as_deref(), Some("hex"));
        assert_eq!(
            nokia.address.as_deref(),
            Some("No.388 Ning Qiao Road,Jin Qiao Pudong Shanghai Shanghai   201206 CN")
        );

        let extreme = &report.records[1];
        assert_eq!(extreme.prefix.as_str(), "08EA44");
        assert_eq!(
            extreme.address.as_deref(),
            Some("2121 RDU Center Drive Morrisville  NC  27560 US")
        );
    }

    #[test]
    fn test_header_followed_by_header_has_no_address() {
        let report = parse(
            "AA-BB-CC   (hex)\t\tPrivate\n\
             AABBCC     (base 16)\t\tPrivate\n\
             \n\
             DD-EE-FF   (hex)\t\tAcme Corp\n\
             \t\t\t\t1 Road\n",
        );

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].vendor_name, "Private");
        assert_eq!(report.records[0].address, None);
        assert_eq!(report.records[1].address.as_deref(), Some("1 Road"));
    }

    #[test]
    fn test_skipped_header_address_is_not_inherited() {
        let bad_prefix = parse(
            "AA-BB-CC   (hex)\t\tPrivate\n\
             XY-ZZ-12   (hex)\t\tBad Prefix Inc\n\
             \t\t\t\tBad Street 1\n",
        );
        assert_eq!(bad_prefix.records.len(), 1);
        assert_eq!(bad_prefix.anomalies.len(), 1);
        assert_eq!(bad_prefix.records[0].address, None);

        let repeated = parse(
            "00-11-22   (hex)\t\tDup Vendor\n\
             \t\t\t\tFirst Street\n\
             AA-BB-CC   (hex)\t\tNo Address Co\n\
             00-11-22   (hex)\t\tDup Vendor\n\
             \t\t\t\tDup Street\n",
        );
        assert_eq!(repeated.records.len(), 2);
        assert_eq!(repeated.duplicates, 1);
        assert_eq!(repeated.records[0].address.as_deref(), Some("First Street"));
        assert_eq!(repeated.records[1].vendor_name, "No Address Co");
        assert_eq!(repeated.records[1].address, None);
    }

    #[test]
    fn test_trailing_header_without_address() {
        let report = parse("AC-DE-48   (hex)\tTest Vendor\n");
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].address, None);
    }

    #[test]
    fn test_base16_only_entry() {
        let report = parse("ACDE48     (base 16)\t\tTest Vendor\n");
        assert_eq!(report.records[0].prefix.as_str(), "ACDE48");
        assert_eq!(report.records[0].vendor_type.as_deref(), Some("base 16"));
    }

    #[test]
    fn test_missing_vendor_is_discarded() {
        let report = parse(
            "AC-DE-48   (hex)\n\
             \t\t\t\t123 Main St\n\
             00-11-22   (hex)\tOther Vendor\n",
        );
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].prefix.as_str(), "001122");
        assert_eq!(report.discarded, 1);
    }

    #[test]
    fn test_malformed_rows_are_counted_and_skipped() {
        let report = parse(
            "AC-DE-48   (hex)\tTest Vendor\n\
             garbage without columns\n\
             XY-ZZ-12   (hex)\tBad Prefix Inc\n\
             \t\tsplit\taddress\n\
             00-11-22   (hex)\tOther Vendor\n",
        );

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.anomaly_count(), 3);
        let lines: Vec<usize> = report.anomalies.iter().map(|a| a.line).collect();
        assert_eq!(lines, vec![6, 7, 8]);
    }

    #[test]
    fn test_preamble_is_not_an_anomaly() {
        let report = parse("AC-DE-48   (hex)\tTest Vendor\n");
        assert!(report.anomalies.is_empty());
    }

    #[test]
    fn test_crlf_input() {
        let text = "OUI/MA-L\t\tOrganization\r\n\
                    AC-DE-48   (hex)\t\tTest Vendor\r\n\
                    \t\t\t\t123 Main St\r\n";
        let report = RegistryParser::new().parse_str(text);
        assert_eq!(report.records[0].vendor_name, "Test Vendor");
        assert_eq!(report.records[0].address.as_deref(), Some("123 Main St"));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let body = "AC-DE-48   (hex)\tTest Vendor\n\
                    \t\t\t\t123 Main St\n\
                    broken row\n\
                    00-11-22   (hex)\tOther Vendor\n";
        assert_eq!(parse(body), parse(body));
    }

    #[test]
    fn test_parse_file_reads_staging() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oui.txt");
        std::fs::write(&path, format!("{}AC-DE-48   (hex)\tTest Vendor\n", HEADER)).unwrap();

        let report = RegistryParser::new().parse_file(&path).unwrap();
        assert_eq!(report.records.len(), 1);

        let missing = RegistryParser::new().parse_file(&dir.path().join("nope.txt"));
        assert!(matches!(missing, Err(MacvenError::Io { .. })));
    }

    #[test]
    fn test_classify_rows() {
        assert_eq!(classify("   "), Row::Blank);
        assert_eq!(classify("\t\t\tCN"), Row::Continuation("CN"));
        assert_eq!(
            classify("AC-DE-48   (hex)\t\tTest Vendor"),
            Row::Header {
                key: "AC-DE-48",
                kind: "hex",
                vendor: Some("Test Vendor".to_string()),
            }
        );
        assert!(matches!(classify("AC-DE-48 (hex\tX"), Row::Malformed(_)));
    }
}
