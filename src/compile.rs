use std::collections::HashMap;

use regex::Regex;

use crate::template::{parse_action, parse_condition};
use crate::types::{Diagnostic, Severity, ValidationError};
use crate::workbook::{Sheet, Workbook, DATA_START};
use crate::{
    CompileError, Effect, MatchOp, Predicate, RequestField, ResponseField, RuleBase,
    RuleBaseBuilder,
};

const RULE_TABLE_MARKER: &str = "RuleTable";
const KINDS_OFFSET: usize = 1;
const TEMPLATES_OFFSET: usize = 3;

/// Read the namespace from the first rule sheet's header (row 0, column 1).
///
/// Later rule sheets declaring a different namespace are compiled into the
/// first one; the mismatch is logged.
///
/// # Errors
///
/// Returns [`ValidationError::NoRuleSheets`] if the document has no rule
/// sheet and [`ValidationError::BlankNamespace`] if the header cell is blank.
pub fn detect_namespace(workbook: &Workbook) -> Result<String, ValidationError> {
    let mut sheets = workbook.rule_sheets();
    let first = sheets.next().ok_or(ValidationError::NoRuleSheets)?;
    let namespace = first.cell(0, 1).trim();
    if namespace.is_empty() {
        return Err(ValidationError::BlankNamespace {
            sheet: first.name.clone(),
        });
    }
    for other in sheets {
        let declared = other.cell(0, 1).trim();
        if declared != namespace {
            tracing::warn!(
                sheet = %other.name,
                declared,
                namespace,
                "rule sheet declares a different namespace; using the first"
            );
        }
    }
    Ok(namespace.to_owned())
}

#[derive(Debug)]
enum Column {
    Condition {
        index: usize,
        field: RequestField,
        op: MatchOp,
    },
    Action {
        index: usize,
        field: ResponseField,
    },
}

/// Compile every rule sheet of a validated document into one rule base.
///
/// Data rows become rules in document order, all under `namespace`.
/// Diagnostics are collected across every sheet before the build is checked.
///
/// # Errors
///
/// Returns [`CompileError`] if any error-severity diagnostic was reported.
pub fn compile(
    workbook: &Workbook,
    namespace: &str,
    version_tag: &str,
) -> Result<RuleBase, CompileError> {
    let mut builder = RuleBaseBuilder::new(namespace).version_tag(version_tag);

    for sheet in workbook.rule_sheets() {
        compile_sheet(sheet, &mut builder);
    }

    for d in builder.diagnostics() {
        match d.severity {
            Severity::Error => tracing::error!(diagnostic = %d, "rule compile error"),
            Severity::Warning => tracing::warn!(diagnostic = %d, "rule compile warning"),
        }
    }

    builder.build()
}

fn compile_sheet(sheet: &Sheet, builder: &mut RuleBaseBuilder) {
    let Some(header) = (1..DATA_START).find(|&r| table_name(sheet.cell(r, 0)).is_some()) else {
        builder.report(Diagnostic::error(
            &sheet.name,
            format!("missing {RULE_TABLE_MARKER} header above row {}", DATA_START + 1),
        ));
        return;
    };

    if header + TEMPLATES_OFFSET >= DATA_START {
        builder.report(
            Diagnostic::error(
                &sheet.name,
                format!(
                    "{RULE_TABLE_MARKER} header leaves no room for the kind and template rows before row {}",
                    DATA_START + 1
                ),
            )
            .at(header, Some(0)),
        );
        return;
    }

    let table = match table_name(sheet.cell(header, 0)).unwrap_or_default() {
        "" => sheet.name.as_str(),
        name => name,
    }
    .replace(char::is_whitespace, "_");

    let columns = read_columns(sheet, header, builder);
    let Some(columns) = columns else {
        return;
    };

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut compiled = 0_usize;

    for row in sheet.data_rows() {
        let mut predicates = Vec::new();
        let mut effects = Vec::new();
        let mut broken = false;

        for column in &columns {
            match *column {
                Column::Condition { index, field, op } => {
                    let value = sheet.cell(row, index).trim();
                    if value.is_empty() {
                        continue;
                    }
                    match predicate(field, op, value) {
                        Ok(p) => predicates.push(p),
                        Err(e) => {
                            builder.report(
                                Diagnostic::error(
                                    &sheet.name,
                                    format!("invalid pattern for {field}: {e}"),
                                )
                                .at(row, Some(index)),
                            );
                            broken = true;
                        }
                    }
                }
                Column::Action { index, field } => {
                    let value = sheet.cell(row, index).trim();
                    if !value.is_empty() {
                        effects.push(Effect {
                            field,
                            value: value.to_owned(),
                        });
                    }
                }
            }
        }

        if broken {
            continue;
        }

        if effects.is_empty() {
            builder.report(
                Diagnostic::warning(&sheet.name, "row has no action values and sets nothing")
                    .at(row, None),
            );
        }

        let key = predicates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" AND ");
        if let Some(earlier) = seen.insert(key, row) {
            builder.report(
                Diagnostic::warning(
                    &sheet.name,
                    format!(
                        "conditions repeat row {}; this row overwrites it when both fire",
                        earlier + 1
                    ),
                )
                .at(row, None),
            );
        }

        builder.push_rule(&format!("{table}_{}", row + 1), predicates, effects);
        compiled += 1;
    }

    if compiled == 0 {
        builder.report(Diagnostic::warning(&sheet.name, "rule table has no data rows"));
    }
}

/// Resolve the CONDITION and ACTION columns below a `RuleTable` header.
fn read_columns(
    sheet: &Sheet,
    header: usize,
    builder: &mut RuleBaseBuilder,
) -> Option<Vec<Column>> {
    let kinds_row = header + KINDS_OFFSET;
    let templates_row = header + TEMPLATES_OFFSET;
    let width = sheet.rows.get(kinds_row).map_or(0, Vec::len);

    let mut columns = Vec::new();
    let mut failed = false;

    for index in 1..width {
        let kind = sheet.cell(kinds_row, index).trim();
        if kind.is_empty() {
            continue;
        }
        let template = sheet.cell(templates_row, index).trim();
        if template.is_empty() {
            builder.report(
                Diagnostic::error(&sheet.name, format!("{kind} column has no template"))
                    .at(templates_row, Some(index)),
            );
            failed = true;
            continue;
        }

        let column = if kind.eq_ignore_ascii_case("CONDITION") {
            parse_condition(template).map(|t| Column::Condition {
                index,
                field: t.field,
                op: t.op,
            })
        } else if kind.eq_ignore_ascii_case("ACTION") {
            parse_action(template).map(|t| Column::Action {
                index,
                field: t.field,
            })
        } else {
            builder.report(
                Diagnostic::error(&sheet.name, format!("unknown column kind '{kind}'"))
                    .at(kinds_row, Some(index)),
            );
            failed = true;
            continue;
        };

        match column {
            Ok(c) => columns.push(c),
            Err(e) => {
                builder.report(
                    Diagnostic::error(&sheet.name, e.to_string()).at(templates_row, Some(index)),
                );
                failed = true;
            }
        }
    }

    if !columns.iter().any(|c| matches!(c, Column::Condition { .. })) {
        builder.report(
            Diagnostic::error(&sheet.name, "rule table has no CONDITION columns")
                .at(kinds_row, None),
        );
        failed = true;
    }
    if !columns.iter().any(|c| matches!(c, Column::Action { .. })) {
        builder.report(
            Diagnostic::error(&sheet.name, "rule table has no ACTION columns").at(kinds_row, None),
        );
        failed = true;
    }

    (!failed).then_some(columns)
}

/// The table name after a `RuleTable` marker, if the cell holds one.
fn table_name(cell: &str) -> Option<&str> {
    let cell = cell.trim();
    let marker = cell.get(..RULE_TABLE_MARKER.len())?;
    marker
        .eq_ignore_ascii_case(RULE_TABLE_MARKER)
        .then(|| cell[RULE_TABLE_MARKER.len()..].trim())
}

fn predicate(field: RequestField, op: MatchOp, value: &str) -> Result<Predicate, regex::Error> {
    Ok(match op {
        MatchOp::Eq => Predicate::Equals {
            field,
            value: value.to_owned(),
        },
        MatchOp::Neq => Predicate::NotEquals {
            field,
            value: value.to_owned(),
        },
        MatchOp::Matches => Predicate::Matches {
            field,
            pattern: Regex::new(&format!("^(?:{value})$"))?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiscountRequest, DiscountResponse};

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_owned()).collect()
    }

    fn header() -> Vec<Vec<String>> {
        vec![
            row(&["RuleSet", "loyalty"]),
            row(&["Import", "loyalty.DiscountRequest"]),
            row(&[]),
            row(&[]),
            row(&["RuleTable Discounts"]),
            row(&["", "CONDITION", "CONDITION", "CONDITION", "CONDITION", "CONDITION", "ACTION", "ACTION"]),
            row(&["", "request : DiscountRequest"]),
            row(&[
                "",
                "country",
                "state",
                "city",
                "loyaltyTier",
                "loyaltyPeriod",
                "response.setConversionRateUSD(\"$param\")",
                "response.setDiscountPercentage(\"$param\")",
            ]),
            row(&["", "Country", "State", "City", "Tier", "Period", "Rate", "Discount"]),
        ]
    }

    fn sheet(name: &str, data: &[&[&str]]) -> Sheet {
        let mut rows = header();
        rows.extend(data.iter().map(|r| row(r)));
        Sheet::new(name, rows)
    }

    fn build(sheets: Vec<Sheet>) -> Result<RuleBase, CompileError> {
        let wb = Workbook::new(sheets);
        let ns = detect_namespace(&wb).unwrap();
        compile(&wb, &ns, "v1")
    }

    #[test]
    fn compiles_one_rule_per_data_row() {
        let base = build(vec![sheet(
            "S",
            &[
                &["", "AU", "NSW", "SYD", "BRZ", "1", "0.7", "0.66"],
                &["", "AU", "VIC", "MEL", "SLV", "2", "0.7", "0.5"],
            ],
        )])
        .unwrap();

        assert_eq!(base.namespace(), "loyalty");
        assert_eq!(base.version_tag(), "v1");
        assert_eq!(base.execution_order(), vec!["Discounts_10", "Discounts_11"]);

        let rule = &base.rules()[0];
        assert_eq!(rule.predicates().len(), 5);
        assert_eq!(rule.effects().len(), 2);

        let mut resp = DiscountResponse::new();
        let req = DiscountRequest::new("AU", "NSW", "SYD", "BRZ", "1");
        assert!(rule.matches(&req));
        rule.fire(&mut resp);
        assert_eq!(resp.conversion_rate_usd.as_deref(), Some("0.7"));
        assert_eq!(resp.discount_percentage.as_deref(), Some("0.66"));
    }

    #[test]
    fn rules_from_all_sheets_share_the_first_namespace() {
        let mut second = sheet("T", &[&["", "NZ", "AKL", "AKL", "GLD", "3", "0.6", "0.1"]]);
        second.rows[0][1] = "other".to_owned();
        let base = build(vec![
            sheet("S", &[&["", "AU", "NSW", "SYD", "BRZ", "1", "0.7", "0.66"]]),
            second,
        ])
        .unwrap();

        assert_eq!(base.rules().len(), 2);
        assert!(base.rules().iter().all(|r| r.namespace() == "loyalty"));
        assert_eq!(base.rules()[1].ordinal(), 1);
    }

    #[test]
    fn missing_rule_table_is_an_error() {
        let mut s = sheet("S", &[&["", "AU", "NSW", "SYD", "BRZ", "1", "0.7", "0.66"]]);
        s.rows[4][0] = String::new();
        let err = build(vec![s]).unwrap_err();
        assert!(err.diagnostics[0].message.starts_with("missing RuleTable header"));
    }

    #[test]
    fn unknown_template_field_is_located() {
        let mut s = sheet("S", &[&["", "AU", "NSW", "SYD", "BRZ", "1", "0.7", "0.66"]]);
        s.rows[7][3] = "postcode".to_owned();
        let err = build(vec![s]).unwrap_err();
        assert_eq!(err.diagnostics.len(), 1);
        let d = &err.diagnostics[0];
        assert_eq!((d.row, d.column), (Some(7), Some(3)));
        assert!(d.message.contains("unknown request field 'postcode'"));
    }

    #[test]
    fn table_without_actions_is_an_error() {
        let mut s = sheet("S", &[&["", "AU", "NSW", "SYD", "BRZ", "1", "0.7", "0.66"]]);
        s.rows[5].truncate(6);
        let err = build(vec![s]).unwrap_err();
        assert!(err
            .diagnostics
            .iter()
            .any(|d| d.message == "rule table has no ACTION columns"));
    }

    #[test]
    fn matches_column_compiles_anchored_pattern() {
        let mut s = sheet("S", &[&["", "AU", "NSW|VIC", "SYD", "BRZ", "1", "0.7", "0.66"]]);
        s.rows[7][2] = "state matches \"$param\"".to_owned();
        let base = build(vec![s]).unwrap();
        let rule = &base.rules()[0];
        assert!(rule.matches(&DiscountRequest::new("AU", "VIC", "SYD", "BRZ", "1")));
        assert!(!rule.matches(&DiscountRequest::new("AU", "VICX", "SYD", "BRZ", "1")));
    }

    #[test]
    fn invalid_pattern_cell_is_an_error() {
        let mut s = sheet("S", &[&["", "AU", "(NSW", "SYD", "BRZ", "1", "0.7", "0.66"]]);
        s.rows[7][2] = "state matches \"$param\"".to_owned();
        let err = build(vec![s]).unwrap_err();
        let d = &err.diagnostics[0];
        assert_eq!((d.row, d.column), (Some(9), Some(2)));
    }

    #[test]
    fn duplicate_conditions_warn_but_compile() {
        let wb = Workbook::new(vec![sheet(
            "S",
            &[
                &["", "AU", "NSW", "SYD", "BRZ", "1", "0.7", "0.66"],
                &["", "AU", "NSW", "SYD", "BRZ", "1", "0.8", "0.5"],
            ],
        )]);
        let mut builder = RuleBaseBuilder::new("loyalty");
        compile_sheet(&wb.sheets[0], &mut builder);
        assert_eq!(builder.diagnostics().len(), 1);
        assert_eq!(builder.diagnostics()[0].severity, Severity::Warning);
        assert!(builder.build().is_ok());
    }

    #[test]
    fn blank_namespace_is_rejected() {
        let mut s = sheet("S", &[]);
        s.rows[0][1] = "  ".to_owned();
        let err = detect_namespace(&Workbook::new(vec![s])).unwrap_err();
        assert!(matches!(err, ValidationError::BlankNamespace { sheet } if sheet == "S"));
    }

    #[test]
    fn document_without_rule_sheets_is_rejected() {
        let index = Sheet::new("Master", vec![row(&["Index"])]);
        let err = detect_namespace(&Workbook::new(vec![index])).unwrap_err();
        assert!(matches!(err, ValidationError::NoRuleSheets));
    }

    #[test]
    fn namespace_comes_from_first_rule_sheet_only() {
        let index = Sheet::new("Master", vec![row(&["Index", "ignored"])]);
        let wb = Workbook::new(vec![index, sheet("S", &[])]);
        assert_eq!(detect_namespace(&wb).unwrap(), "loyalty");
    }
}
