//! ニュース見出しのシグナル分類。
//!
//! 分類は順序付きルール表（パターン → シグナル）で行う。照合は小文字化した
//! 見出しに対する部分一致で、複数カテゴリにヒットした場合は
//! negative > monitor > positive の優先順で一つだけを採用する。

use std::fs;
use std::path::Path;

use aho_corasick::AhoCorasick;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// 見出し一件に付与されるシグナル。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Negative,
    Monitor,
    Positive,
}

impl Signal {
    /// 評価順。先頭ほど優先される。
    pub const PRECEDENCE: [Self; 3] = [Self::Negative, Self::Monitor, Self::Positive];

    const fn rank(self) -> u8 {
        match self {
            Self::Negative => 0,
            Self::Monitor => 1,
            Self::Positive => 2,
        }
    }
}

/// シグナル件数の集計。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCounts {
    pub positive: u32,
    pub monitor: u32,
    pub negative: u32,
}

impl SignalCounts {
    /// 一件分の分類結果をフラグ表現に変換する（最大で一つだけ 1 になる）。
    #[must_use]
    pub fn of(signal: Option<Signal>) -> Self {
        let mut counts = Self::default();
        counts.record(signal);
        counts
    }

    pub fn record(&mut self, signal: Option<Signal>) {
        match signal {
            Some(Signal::Positive) => self.positive = self.positive.saturating_add(1),
            Some(Signal::Monitor) => self.monitor = self.monitor.saturating_add(1),
            Some(Signal::Negative) => self.negative = self.negative.saturating_add(1),
            None => {}
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.positive
            .saturating_add(self.monitor)
            .saturating_add(self.negative)
    }
}

/// ルール表の一行。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRule {
    pub pattern: String,
    pub signal: Signal,
}

impl SignalRule {
    #[must_use]
    pub fn new(pattern: impl Into<String>, signal: Signal) -> Self {
        Self {
            pattern: pattern.into(),
            signal,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SignalRuleFile {
    rules: Vec<SignalRule>,
}

#[derive(Debug, Error)]
pub enum SignalRuleError {
    #[error("signal rule #{index} has an empty pattern")]
    EmptyPattern { index: usize },
    #[error("failed to read signal rules from {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse signal rules from {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to build signal matcher")]
    Build(#[from] aho_corasick::BuildError),
}

/// 既定の PT-BR キーワード表。語幹で書いておき、活用形にも部分一致させる。
const DEFAULT_RULES: &[(&str, Signal)] = &[
    // crime / disaster
    ("assalto", Signal::Negative),
    ("roubo", Signal::Negative),
    ("furto", Signal::Negative),
    ("arrastão", Signal::Negative),
    ("latrocínio", Signal::Negative),
    ("homicídio", Signal::Negative),
    ("assassin", Signal::Negative),
    ("tiroteio", Signal::Negative),
    ("baleado", Signal::Negative),
    ("sequestro", Signal::Negative),
    ("tráfico", Signal::Negative),
    ("violência", Signal::Negative),
    ("crime", Signal::Negative),
    ("enchente", Signal::Negative),
    ("alagamento", Signal::Negative),
    ("inundação", Signal::Negative),
    ("deslizamento", Signal::Negative),
    ("desabamento", Signal::Negative),
    ("incêndio", Signal::Negative),
    ("explosão", Signal::Negative),
    ("morte", Signal::Negative),
    // investigation / alert / outbreak
    ("investiga", Signal::Monitor),
    ("alerta", Signal::Monitor),
    ("surto", Signal::Monitor),
    ("dengue", Signal::Monitor),
    ("epidemia", Signal::Monitor),
    ("interdi", Signal::Monitor),
    ("denúncia", Signal::Monitor),
    ("fiscaliza", Signal::Monitor),
    ("protesto", Signal::Monitor),
    ("greve", Signal::Monitor),
    ("suspens", Signal::Monitor),
    ("risco", Signal::Monitor),
    // construction / investment
    ("inaugura", Signal::Positive),
    ("obra", Signal::Positive),
    ("construção", Signal::Positive),
    ("investimento", Signal::Positive),
    ("revitaliza", Signal::Positive),
    ("reforma", Signal::Positive),
    ("parque", Signal::Positive),
    ("metrô", Signal::Positive),
    ("estação", Signal::Positive),
    ("ciclovia", Signal::Positive),
    ("expansão", Signal::Positive),
    ("valoriza", Signal::Positive),
    ("novo hospital", Signal::Positive),
    ("nova escola", Signal::Positive),
];

/// 見出し分類器。
#[derive(Debug, Clone)]
pub struct SignalClassifier {
    matcher: AhoCorasick,
    signals: Vec<Signal>,
}

impl SignalClassifier {
    /// ルール表から分類器を構築する。パターンは小文字化して登録する。
    ///
    /// # Errors
    /// 空のパターンが含まれる場合、またはマッチャの構築に失敗した場合。
    pub fn new(rules: &[SignalRule]) -> Result<Self, SignalRuleError> {
        let mut patterns = Vec::with_capacity(rules.len());
        let mut signals = Vec::with_capacity(rules.len());
        for (index, rule) in rules.iter().enumerate() {
            let pattern = rule.pattern.trim().to_lowercase();
            if pattern.is_empty() {
                return Err(SignalRuleError::EmptyPattern { index });
            }
            patterns.push(pattern);
            signals.push(rule.signal);
        }

        let matcher = AhoCorasick::new(&patterns)?;
        Ok(Self { matcher, signals })
    }

    /// 組み込みの PT-BR ルール表を使う。
    ///
    /// # Errors
    /// マッチャの構築に失敗した場合。
    pub fn portuguese() -> Result<Self, SignalRuleError> {
        Self::new(&default_rules())
    }

    /// YAML ファイル（`rules: [{pattern, signal}]`）からルール表を読み込む。
    ///
    /// # Errors
    /// 読み込み・パース・構築のいずれかに失敗した場合。
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, SignalRuleError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|source| SignalRuleError::Read {
            path: shown.clone(),
            source,
        })?;
        let file: SignalRuleFile =
            serde_yaml::from_str(&raw).map_err(|source| SignalRuleError::Parse {
                path: shown.clone(),
                source,
            })?;
        debug!(path = %shown, rules = file.rules.len(), "loaded signal rules");
        Self::new(&file.rules)
    }

    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.signals.len()
    }

    /// 見出しを分類する。どのルールにもヒットしなければ `None`。
    #[must_use]
    pub fn classify(&self, title: &str) -> Option<Signal> {
        let haystack = title.to_lowercase();
        let mut best: Option<Signal> = None;
        for found in self.matcher.find_overlapping_iter(&haystack) {
            let Some(&signal) = self.signals.get(found.pattern().as_usize()) else {
                continue;
            };
            if signal == Signal::Negative {
                return Some(signal);
            }
            if best.is_none_or(|current| signal.rank() < current.rank()) {
                best = Some(signal);
            }
        }
        best
    }

    /// 見出し群を分類し、カテゴリごとに合計する。
    #[must_use]
    pub fn tally<'a, I>(&self, titles: I) -> SignalCounts
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts = SignalCounts::default();
        for title in titles {
            counts.record(self.classify(title));
        }
        counts
    }
}

/// 組み込みルール表のコピーを返す。
#[must_use]
pub fn default_rules() -> Vec<SignalRule> {
    DEFAULT_RULES
        .iter()
        .map(|(pattern, signal)| SignalRule::new(*pattern, *signal))
        .collect()
}
