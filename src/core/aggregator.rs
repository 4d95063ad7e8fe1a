use crate::domain::model::{AggregateKey, Mode, ResultRecord};
use std::collections::BTreeMap;

/// 合併多次執行的結果，以 (突變名稱, 模式家族) 為鍵
///
/// 同一突變的一般模式與能量模式會回報互補的欄位：穩定性描述與可信度以一般模式
/// (`-seq`/`-pdb`) 為準，ΔΔG 以能量模式 (`-seqv`/`-pdbv`) 為準。pH 與溫度也以
/// 一般模式為準，只有能量模式時才採用其回報值。因此合併結果與到達順序無關。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultAggregator {
    table: BTreeMap<AggregateKey, ResultRecord>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, record: &ResultRecord, mode: Mode) {
        let key = AggregateKey::new(record.name.clone(), mode.family());

        match self.table.get_mut(&key) {
            None => {
                self.table.insert(key, record.clone());
            }
            Some(existing) if mode.is_energy_variant() => {
                existing.energy_change = record.energy_change.clone();
            }
            Some(existing) => {
                existing.description = record.description.clone();
                existing.reliability_index = record.reliability_index.clone();
                existing.ph = record.ph.clone();
                existing.temperature = record.temperature.clone();
            }
        }
    }

    /// 合併一個工作的所有紀錄，回傳合併筆數
    pub fn merge_all(&mut self, records: &[ResultRecord], mode: Mode) -> usize {
        for record in records {
            self.merge(record, mode);
        }
        records.len()
    }

    pub fn get(&self, key: &AggregateKey) -> Option<&ResultRecord> {
        self.table.get(key)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// 依鍵排序迭代
    pub fn iter(&self) -> impl Iterator<Item = (&AggregateKey, &ResultRecord)> {
        self.table.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ModeFamily, NOT_APPLICABLE};

    fn qualitative(name: &str, description: &str, ri: &str) -> ResultRecord {
        ResultRecord {
            name: name.to_string(),
            energy_change: NOT_APPLICABLE.to_string(),
            description: description.to_string(),
            reliability_index: ri.to_string(),
            ph: "7.0".to_string(),
            temperature: "25".to_string(),
        }
    }

    fn energy(name: &str, ddg: &str, ph: &str) -> ResultRecord {
        ResultRecord {
            name: name.to_string(),
            energy_change: ddg.to_string(),
            description: NOT_APPLICABLE.to_string(),
            reliability_index: NOT_APPLICABLE.to_string(),
            ph: ph.to_string(),
            temperature: "25".to_string(),
        }
    }

    #[test]
    fn test_complementary_modes_merge_into_one_entry() {
        let mut aggregator = ResultAggregator::new();
        aggregator.merge(&qualitative("A23G", "Decrease", "7"), Mode::Seq);
        aggregator.merge(&energy("A23G", "-0.85", "7.0"), Mode::SeqEnergy);

        assert_eq!(aggregator.len(), 1);
        let merged = aggregator
            .get(&AggregateKey::new("A23G", ModeFamily::Seq))
            .unwrap();
        assert_eq!(merged.description, "Decrease");
        assert_eq!(merged.reliability_index, "7");
        assert_eq!(merged.energy_change, "-0.85");
    }

    #[test]
    fn test_merge_is_commutative() {
        let seq = qualitative("A23G", "Decrease", "7");
        let seqv = energy("A23G", "-0.85", "6.5");

        let mut forward = ResultAggregator::new();
        forward.merge(&seq, Mode::Seq);
        forward.merge(&seqv, Mode::SeqEnergy);

        let mut reverse = ResultAggregator::new();
        reverse.merge(&seqv, Mode::SeqEnergy);
        reverse.merge(&seq, Mode::Seq);

        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let seq = qualitative("A23G", "Decrease", "7");

        let mut once = ResultAggregator::new();
        once.merge(&seq, Mode::Seq);

        let mut twice = once.clone();
        twice.merge(&seq, Mode::Seq);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_families_are_kept_apart() {
        let mut aggregator = ResultAggregator::new();
        aggregator.merge(&qualitative("A23G", "Decrease", "7"), Mode::Seq);
        aggregator.merge(&qualitative("A23G", "Increase", "2"), Mode::Pdb);

        assert_eq!(aggregator.len(), 2);
        let keys: Vec<String> = aggregator.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["A23G:seq", "A23G:pdb"]);
    }

    #[test]
    fn test_energy_only_entry_keeps_sentinels() {
        let mut aggregator = ResultAggregator::new();
        let merged = aggregator.merge_all(&[energy("K10A", "1.20", "7.0")], Mode::PdbEnergy);

        assert_eq!(merged, 1);
        let record = aggregator
            .get(&AggregateKey::new("K10A", ModeFamily::Pdb))
            .unwrap();
        assert_eq!(record.description, NOT_APPLICABLE);
        assert_eq!(record.energy_change, "1.20");
    }
}
