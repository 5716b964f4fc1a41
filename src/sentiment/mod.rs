//! 어휘 사전 기반 감성 분석.
//!
//! 각 토큰의 극성 값을 합산한 뒤 부스터/부정어/대문자 강조/느낌표/"but" 규칙으로
//! 보정하고, `x / sqrt(x^2 + 15)` 로 정규화한 compound 점수(-1..1)를 만든다.
//! 사전은 프로세스 전체에서 한 번만 로드되며 (`init`), 점수 계산 자체는 순수 함수다.

mod rules;

use std::collections::HashMap;
use std::sync::{LazyLock, OnceLock};

use regex::Regex;
use sea_orm::sea_query::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

const LEXICON: &str = include_str!("lexicon.tsv");

pub const POSITIVE_THRESHOLD: f64 = 0.05;
pub const NEGATIVE_THRESHOLD: f64 = -0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Sentiment {
    #[sea_orm(string_value = "Positive")]
    Positive,
    #[sea_orm(string_value = "Negative")]
    Negative,
    #[sea_orm(string_value = "Neutral")]
    Neutral,
}

impl Sentiment {
    pub fn from_compound(score: f64) -> Self {
        if score >= POSITIVE_THRESHOLD {
            Sentiment::Positive
        } else if score <= NEGATIVE_THRESHOLD {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PolarityScores {
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    pub compound: f64,
}

pub struct SentimentAnalyzer {
    lexicon: HashMap<String, f64>,
}

static ANALYZER: OnceLock<SentimentAnalyzer> = OnceLock::new();

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9][A-Za-z0-9'\-]*").expect("token pattern is valid"));

/// 사전을 로드한다. 서버 시작 시 한 번 호출하며, 이후 호출은 같은 인스턴스를 돌려준다.
pub fn init() -> &'static SentimentAnalyzer {
    ANALYZER.get_or_init(|| {
        let analyzer = SentimentAnalyzer::from_lexicon(LEXICON);
        info!(entries = analyzer.lexicon.len(), "감성 사전 로드 완료");
        analyzer
    })
}

pub fn classify(text: &str) -> Sentiment {
    init().classify(text)
}

impl SentimentAnalyzer {
    pub fn from_lexicon(source: &str) -> Self {
        let mut lexicon = HashMap::new();

        for (line_no, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split('\t');
            match (parts.next(), parts.next().map(str::parse::<f64>)) {
                (Some(token), Some(Ok(valence))) => {
                    lexicon.insert(token.to_lowercase(), valence);
                }
                _ => warn!(line = line_no + 1, "감성 사전의 잘못된 항목을 건너뜀"),
            }
        }

        Self { lexicon }
    }

    pub fn classify(&self, text: &str) -> Sentiment {
        Sentiment::from_compound(self.polarity_scores(text).compound)
    }

    pub fn polarity_scores(&self, text: &str) -> PolarityScores {
        let tokens: Vec<&str> = TOKEN
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|t| t.chars().count() > 1)
            .collect();
        let lowered: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        let cap_differential = rules::has_cap_differential(&tokens);

        let mut sentiments = Vec::with_capacity(tokens.len());
        for i in 0..tokens.len() {
            sentiments.push(self.token_valence(&tokens, &lowered, i, cap_differential));
        }

        rules::apply_but_rule(&lowered, &mut sentiments);

        if sentiments.is_empty() {
            return PolarityScores { neg: 0.0, neu: 0.0, pos: 0.0, compound: 0.0 };
        }

        let punct = rules::punctuation_emphasis(text);
        let mut sum: f64 = sentiments.iter().sum();
        if sum > 0.0 {
            sum += punct;
        } else if sum < 0.0 {
            sum -= punct;
        }

        let (pos, neg, neu) = rules::sift(&sentiments, punct);
        let total = pos + neg.abs() + neu;
        let ratio = |v: f64| if total > 0.0 { round3(v / total) } else { 0.0 };

        PolarityScores {
            neg: ratio(neg.abs()),
            neu: ratio(neu),
            pos: ratio(pos),
            compound: round4(rules::normalize(sum)),
        }
    }

    fn token_valence(&self, tokens: &[&str], lowered: &[String], i: usize, cap_differential: bool) -> f64 {
        let word = lowered[i].as_str();

        if rules::booster(word).is_some() {
            return 0.0;
        }
        if word == "kind" && lowered.get(i + 1).map(String::as_str) == Some("of") {
            return 0.0;
        }

        let Some(&base) = self.lexicon.get(word) else {
            return 0.0;
        };

        let mut valence = base;
        if cap_differential && rules::is_shouting(tokens[i]) {
            valence += rules::C_INCR.copysign(valence);
        }

        for distance in 1..=3 {
            if i < distance {
                break;
            }
            let preceding = lowered[i - distance].as_str();
            if self.lexicon.contains_key(preceding) {
                continue;
            }

            let mut scalar = rules::scalar_inc_dec(preceding, tokens[i - distance], valence, cap_differential);
            match distance {
                2 => scalar *= 0.95,
                3 => scalar *= 0.9,
                _ => {}
            }
            valence += scalar;
            valence = rules::negation_check(valence, lowered, distance, i);
        }

        valence
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}
