pub(super) const B_INCR: f64 = 0.293;
pub(super) const B_DECR: f64 = -0.293;
pub(super) const C_INCR: f64 = 0.733;
pub(super) const N_SCALAR: f64 = -0.74;

const NORMALIZE_ALPHA: f64 = 15.0;

const NEGATIONS: &[&str] = &[
    "aint", "arent", "cannot", "cant", "couldnt", "darent", "didnt", "doesnt", "dont", "hadnt",
    "hasnt", "havent", "isnt", "mightnt", "mustnt", "neednt", "oughtnt", "shant", "shouldnt",
    "wasnt", "werent", "wont", "wouldnt", "neither", "never", "none", "nope", "nor", "not",
    "nothing", "nowhere", "uhuh", "uh-uh", "without", "rarely", "seldom", "despite",
];

const INCREMENTS: &[&str] = &[
    "absolutely", "amazingly", "awfully", "completely", "considerably", "decidedly", "deeply",
    "enormously", "entirely", "especially", "exceptionally", "extremely", "fully", "greatly",
    "highly", "hugely", "incredibly", "intensely", "majorly", "more", "most", "particularly",
    "purely", "quite", "really", "remarkably", "so", "substantially", "thoroughly", "totally",
    "tremendously", "unbelievably", "unusually", "utterly", "very",
];

const DECREMENTS: &[&str] = &[
    "almost", "barely", "hardly", "kinda", "less", "little", "marginally", "occasionally",
    "partly", "scarcely", "slightly", "somewhat", "sorta",
];

pub(super) fn booster(word: &str) -> Option<f64> {
    if INCREMENTS.contains(&word) {
        Some(B_INCR)
    } else if DECREMENTS.contains(&word) {
        Some(B_DECR)
    } else {
        None
    }
}

pub(super) fn is_negated(word: &str) -> bool {
    NEGATIONS.contains(&word) || word.contains("n't")
}

pub(super) fn is_shouting(token: &str) -> bool {
    token.chars().any(|c| c.is_alphabetic())
        && token.chars().all(|c| !c.is_alphabetic() || c.is_uppercase())
}

/// 일부 단어만 대문자일 때만 대문자 강조를 적용한다. 전부 대문자인 문장은 강조로 보지 않는다.
pub(super) fn has_cap_differential(tokens: &[&str]) -> bool {
    let shouting = tokens.iter().filter(|t| is_shouting(t)).count();
    shouting > 0 && shouting < tokens.len()
}

pub(super) fn scalar_inc_dec(word: &str, original: &str, valence: f64, cap_differential: bool) -> f64 {
    let Some(mut scalar) = booster(word) else {
        return 0.0;
    };

    if valence < 0.0 {
        scalar = -scalar;
    }
    if cap_differential && is_shouting(original) {
        scalar += C_INCR.copysign(valence);
    }
    scalar
}

pub(super) fn negation_check(valence: f64, lowered: &[String], distance: usize, i: usize) -> f64 {
    let preceding = lowered[i - distance].as_str();

    if distance > 1 && preceding == "never" {
        let between = lowered[i - distance + 1].as_str();
        if between == "so" || between == "this" {
            return valence * 1.25;
        }
    }

    if is_negated(preceding) {
        valence * N_SCALAR
    } else {
        valence
    }
}

/// "but" 앞 절은 절반, 뒤 절은 1.5배.
pub(super) fn apply_but_rule(lowered: &[String], sentiments: &mut [f64]) {
    let Some(pivot) = lowered.iter().position(|w| w == "but") else {
        return;
    };

    for (idx, valence) in sentiments.iter_mut().enumerate() {
        if idx < pivot {
            *valence *= 0.5;
        } else if idx > pivot {
            *valence *= 1.5;
        }
    }
}

pub(super) fn punctuation_emphasis(text: &str) -> f64 {
    let exclamations = text.matches('!').count().min(4) as f64 * 0.292;

    let questions = text.matches('?').count();
    let question_emphasis = match questions {
        0 | 1 => 0.0,
        2 | 3 => questions as f64 * 0.18,
        _ => 0.96,
    };

    exclamations + question_emphasis
}

/// 양/음/중립 누적값. 각 토큰의 강도에 1을 더해 단어 수가 반영되도록 한다.
pub(super) fn sift(sentiments: &[f64], punct: f64) -> (f64, f64, f64) {
    let mut pos = 0.0;
    let mut neg = 0.0;
    let mut neu = 0.0;

    for &s in sentiments {
        if s > 0.0 {
            pos += s + 1.0;
        } else if s < 0.0 {
            neg += s - 1.0;
        } else {
            neu += 1.0;
        }
    }

    if pos > neg.abs() {
        pos += punct;
    } else if pos < neg.abs() {
        neg -= punct;
    }

    (pos, neg, neu)
}

pub(super) fn normalize(score: f64) -> f64 {
    let normalized = score / (score * score + NORMALIZE_ALPHA).sqrt();
    normalized.clamp(-1.0, 1.0)
}
