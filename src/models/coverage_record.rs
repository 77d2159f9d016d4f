use std::collections::{BTreeMap, BTreeSet};

/// 時刻ステップごとの可視グリッド点（疎形式）
///
/// 可視点のないステップは保持しない。各ステップの点インデックスは昇順・重複なし。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageRecord {
    steps: BTreeMap<usize, Vec<usize>>,
}

impl CoverageRecord {
    pub fn new() -> Self {
        Self { steps: BTreeMap::new() }
    }

    /// ステップの結果を記録する。空の結果は記録しない。
    pub fn insert(&mut self, step: usize, mut indices: Vec<usize>) {
        if indices.is_empty() {
            self.steps.remove(&step);
            return;
        }
        indices.sort_unstable();
        indices.dedup();
        self.steps.insert(step, indices);
    }

    /// アクセスのあったステップ数
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, step: usize) -> Option<&[usize]> {
        self.steps.get(&step).map(Vec::as_slice)
    }

    pub fn contains_step(&self, step: usize) -> bool {
        self.steps.contains_key(&step)
    }

    /// ステップ昇順の (ステップ, 可視点) の反復
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.steps.iter().map(|(step, points)| (*step, points.as_slice()))
    }

    /// (ステップ, 点) の組をステップ昇順・点昇順で列挙
    pub fn access_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.steps
            .iter()
            .flat_map(|(step, points)| points.iter().map(move |point| (*step, *point)))
    }

    /// 総アクセス組数
    pub fn total_accesses(&self) -> usize {
        self.steps.values().map(Vec::len).sum()
    }

    /// 一度でも可視になった点の数
    pub fn distinct_points(&self) -> usize {
        self.steps.values().flatten().collect::<BTreeSet<_>>().len()
    }

    /// (ステップ, 点) の組から再構築する
    pub fn from_access_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut grouped: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (step, point) in pairs {
            grouped.entry(step).or_default().push(point);
        }
        let mut record = Self::new();
        for (step, points) in grouped {
            record.insert(step, points);
        }
        record
    }
}
