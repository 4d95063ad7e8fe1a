//! I-Mutant 2.0 固定欄位報表的解析
//!
//! 報表從以 [`HEADER_MARKER`] 開頭的表頭行開始，之後每一行是一筆突變結果，
//! 直到第一個空白行為止。欄位位置依模式分成兩種版面，集中定義在
//! [`ColumnLayout`] 中，工具版本更新時只需調整這張表。

use crate::domain::model::{Mode, ParseWarning, ResultRecord, NOT_APPLICABLE};
use crate::utils::validation::is_integer;
use std::ops::Range;

/// 表頭行的開頭字串
pub const HEADER_MARKER: &str = "      Position";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Position,
    WildType,
    NewType,
    EnergyChange,
    Description,
    ReliabilityIndex,
    Ph,
    Temperature,
}

/// 欄位名稱到字元位置 (0-based, 半開區間) 的對照表
#[derive(Debug)]
pub struct ColumnLayout {
    pub columns: &'static [(Field, Range<usize>)],
}

/// `-seq` / `-pdb`：穩定性描述與可信度
pub static QUALITATIVE_LAYOUT: ColumnLayout = ColumnLayout {
    columns: &[
        (Field::Position, 7..14),
        (Field::WildType, 18..19),
        (Field::NewType, 22..24),
        (Field::Description, 28..36),
        (Field::ReliabilityIndex, 39..40),
        (Field::Ph, 43..46),
        (Field::Temperature, 49..51),
    ],
};

/// `-seqv` / `-pdbv`：ΔΔG 數值
pub static ENERGY_LAYOUT: ColumnLayout = ColumnLayout {
    columns: &[
        (Field::Position, 7..14),
        (Field::WildType, 18..19),
        (Field::NewType, 22..24),
        (Field::EnergyChange, 27..32),
        (Field::Ph, 34..38),
        (Field::Temperature, 40..43),
    ],
};

impl ColumnLayout {
    pub fn for_mode(mode: Mode) -> &'static ColumnLayout {
        if mode.is_energy_variant() {
            &ENERGY_LAYOUT
        } else {
            &QUALITATIVE_LAYOUT
        }
    }

    /// 取出欄位並去除空白；版面沒有此欄位時回傳 None
    pub fn extract<'a>(&self, line: &'a str, field: Field) -> Option<&'a str> {
        self.columns
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, range)| slice_columns(line, range))
    }

    fn extract_or_na(&self, line: &str, field: Field) -> String {
        self.extract(line, field)
            .unwrap_or(NOT_APPLICABLE)
            .to_string()
    }
}

/// 以字元位置切片；行太短時回傳空字串
fn slice_columns<'a>(line: &'a str, range: &Range<usize>) -> &'a str {
    let byte_offset = |chars: usize| {
        line.char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(line.len())
    };
    let start = byte_offset(range.start);
    let end = byte_offset(range.end).max(start);
    line[start..end].trim()
}

/// 單一工作輸出的解析結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReport {
    pub records: Vec<ResultRecord>,
    pub warnings: Vec<ParseWarning>,
    /// 子程序的 stderr，原樣保留不解析
    pub diagnostics: String,
}

pub fn parse_report(stdout: &str, stderr: &str, mode: Mode) -> ParsedReport {
    let layout = ColumnLayout::for_mode(mode);
    let mut report = ParsedReport {
        diagnostics: stderr.to_string(),
        ..Default::default()
    };

    let mut started = false;
    for (index, line) in stdout.lines().enumerate() {
        if !started {
            started = line.starts_with(HEADER_MARKER);
            continue;
        }

        if line.trim().is_empty() {
            break;
        }

        match parse_row(line, layout) {
            Ok(record) => report.records.push(record),
            Err(reason) => report.warnings.push(ParseWarning::MalformedRow {
                line: index + 1,
                reason,
            }),
        }
    }

    if !started && !stdout.trim().is_empty() {
        report.warnings.push(ParseWarning::MissingHeader);
    }

    report
}

fn parse_row(line: &str, layout: &ColumnLayout) -> std::result::Result<ResultRecord, String> {
    let position = layout.extract(line, Field::Position).unwrap_or_default();
    let wild_type = layout.extract(line, Field::WildType).unwrap_or_default();
    let new_type = layout.extract(line, Field::NewType).unwrap_or_default();

    if !is_integer(position) {
        return Err(format!("position '{}' is not an integer", position));
    }
    if wild_type.is_empty() || new_type.is_empty() {
        return Err("missing residue letters".to_string());
    }

    Ok(ResultRecord {
        name: format!("{}{}{}", wild_type, position, new_type),
        energy_change: layout.extract_or_na(line, Field::EnergyChange),
        description: layout.extract_or_na(line, Field::Description),
        reliability_index: layout.extract_or_na(line, Field::ReliabilityIndex),
        ph: layout.extract_or_na(line, Field::Ph),
        temperature: layout.extract_or_na(line, Field::Temperature),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUALITATIVE_OUTPUT: &str = "\
 I-Mutant v2.0 : Predictor of Protein Stability Changes upon Mutations
 predicting stability for sequence ...

      Position   WT  NEW   Stability  RI  pH    T
       23         A   G     Decrease   7   7.0   25
       104        L   P     Increase   3   7.0   25

 WT: Wild Type Residue
       999        Z   Z     Decrease   9   7.0   25
";

    const ENERGY_OUTPUT: &str = "\
 I-Mutant v2.0
      Position   WT  NEW    DDG  pH    T
       23         A   G    -0.85  7.0   25

";

    #[test]
    fn test_parses_two_rows_and_stops_at_blank_line() {
        let report = parse_report(QUALITATIVE_OUTPUT, "", Mode::Seq);

        assert!(report.warnings.is_empty());
        assert_eq!(report.records.len(), 2);

        let first = &report.records[0];
        assert_eq!(first.name, "A23G");
        assert_eq!(first.energy_change, NOT_APPLICABLE);
        assert_eq!(first.description, "Decrease");
        assert_eq!(first.reliability_index, "7");
        assert_eq!(first.ph, "7.0");
        assert_eq!(first.temperature, "25");

        let second = &report.records[1];
        assert_eq!(second.name, "L104P");
        assert_eq!(second.description, "Increase");
        assert_eq!(second.reliability_index, "3");
    }

    #[test]
    fn test_energy_layout() {
        let report = parse_report(ENERGY_OUTPUT, "", Mode::SeqEnergy);

        assert_eq!(report.records.len(), 1);
        let record = &report.records[0];
        assert_eq!(record.name, "A23G");
        assert_eq!(record.energy_change, "-0.85");
        assert_eq!(record.description, NOT_APPLICABLE);
        assert_eq!(record.reliability_index, NOT_APPLICABLE);
        assert_eq!(record.ph, "7.0");
        assert_eq!(record.temperature, "25");
    }

    #[test]
    fn test_structure_modes_share_layouts() {
        let seq = parse_report(QUALITATIVE_OUTPUT, "", Mode::Seq);
        let pdb = parse_report(QUALITATIVE_OUTPUT, "", Mode::Pdb);
        assert_eq!(seq.records, pdb.records);

        let seqv = parse_report(ENERGY_OUTPUT, "", Mode::SeqEnergy);
        let pdbv = parse_report(ENERGY_OUTPUT, "", Mode::PdbEnergy);
        assert_eq!(seqv.records, pdbv.records);
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let first = parse_report(QUALITATIVE_OUTPUT, "warning: slow", Mode::Seq);
        let second = parse_report(QUALITATIVE_OUTPUT, "warning: slow", Mode::Seq);
        assert_eq!(first, second);
    }

    #[test]
    fn test_header_without_rows_is_empty_table() {
        let output = "      Position   WT  NEW   Stability  RI  pH    T\n\n";
        let report = parse_report(output, "", Mode::Pdb);
        assert!(report.records.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_missing_header_warns() {
        let report = parse_report("Traceback (most recent call last):\n", "boom", Mode::Seq);
        assert!(report.records.is_empty());
        assert_eq!(report.warnings, vec![ParseWarning::MissingHeader]);
        assert_eq!(report.diagnostics, "boom");
    }

    #[test]
    fn test_empty_output_is_not_a_warning() {
        let report = parse_report("", "", Mode::Seq);
        assert!(report.records.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_malformed_row_is_skipped() {
        let output = "      Position\n  garbage line\n       23         A   G     Decrease   7   7.0   25\n";
        let report = parse_report(output, "", Mode::Seq);

        assert_eq!(report.records.len(), 1);
        assert!(matches!(
            report.warnings.as_slice(),
            [ParseWarning::MalformedRow { line: 2, .. }]
        ));
    }

    #[test]
    fn test_short_line_yields_empty_slices() {
        assert_eq!(slice_columns("abc", &(7..14)), "");
        assert_eq!(slice_columns("       23", &(7..14)), "23");
    }

    #[test]
    fn test_crlf_output() {
        let output = QUALITATIVE_OUTPUT.replace('\n', "\r\n");
        let report = parse_report(&output, "", Mode::Seq);
        assert_eq!(report.records.len(), 2);
    }
}
