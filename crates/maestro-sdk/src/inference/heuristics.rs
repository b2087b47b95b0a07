//! Deterministic table-driven estimates
//!
//! Used when no rule answers and no model is available. Every lookup is
//! case-insensitive and an unknown key maps to a neutral factor of 1.0.

use maestro_core::{Context, Value};
use maestro_ml::{coerce, CoercionMode};

use super::types::{ChannelRecommendation, ExplanationItem};

const SOURCE: &str = "heuristic";

const CTR_INDUSTRY: &[(&str, f64)] = &[
    ("technology", 1.2),
    ("retail", 1.0),
    ("finance", 0.8),
    ("healthcare", 0.85),
    ("education", 1.1),
    ("food", 0.9),
    ("fashion", 1.15),
    ("travel", 1.05),
];

const CTR_CHANNEL: &[(&str, f64)] = &[
    ("social_media", 1.1),
    ("search", 1.3),
    ("display", 0.8),
    ("email", 0.9),
    ("video", 1.4),
];

const ROI_INDUSTRY: &[(&str, f64)] = &[
    ("technology", 1.3),
    ("retail", 1.1),
    ("finance", 1.4),
    ("healthcare", 1.2),
    ("education", 0.9),
    ("food", 1.0),
];

const ROI_CHANNEL: &[(&str, f64)] = &[
    ("social_media", 1.0),
    ("search", 1.2),
    ("display", 0.8),
    ("email", 1.4),
    ("video", 1.1),
];

const DEFAULT_AUDIENCE_AGE: (f64, f64) = (25.0, 45.0);

/// Value and its explanation
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicEstimate {
    pub value: f64,
    pub explanation: Vec<ExplanationItem>,
}

fn find(table: &[(&str, f64)], key: Option<&str>) -> Option<f64> {
    let key = key?;
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, factor)| *factor)
}

fn lookup(table: &[(&str, f64)], key: Option<&str>) -> f64 {
    find(table, key).unwrap_or(1.0)
}

fn text<'a>(context: &'a Context, field: &str) -> Option<&'a str> {
    context.get(field).and_then(Value::as_str).map(str::trim)
}

/// Positive, finite budget; numeric strings are accepted
fn budget(context: &Context) -> Option<f64> {
    context
        .get("budget")
        .and_then(|v| coerce(v, CoercionMode::Strict))
        .filter(|b| *b > 0.0)
}

pub fn ctr_industry_factor(industry: Option<&str>) -> f64 {
    lookup(CTR_INDUSTRY, industry)
}

pub fn ctr_channel_factor(channel: Option<&str>) -> f64 {
    lookup(CTR_CHANNEL, channel)
}

pub fn ctr_budget_multiplier(budget: Option<f64>) -> f64 {
    match budget {
        None => 1.0,
        Some(b) if b <= 0.0 => 1.0,
        Some(b) if b < 1000.0 => 0.9,
        Some(b) if b < 5000.0 => 1.0,
        Some(b) if b < 10000.0 => 1.05,
        Some(_) => 1.1,
    }
}

pub fn roi_industry_factor(industry: Option<&str>) -> f64 {
    lookup(ROI_INDUSTRY, industry)
}

pub fn roi_channel_factor(channel: Option<&str>) -> f64 {
    lookup(ROI_CHANNEL, channel)
}

pub fn roi_budget_multiplier(budget: Option<f64>) -> f64 {
    match budget {
        Some(b) if b > 10000.0 => 1.2,
        Some(b) if b > 5000.0 => 1.1,
        _ => 1.0,
    }
}

/// `base_ctr × industry × channel × budget`
pub fn estimate_ctr(context: &Context, base_ctr: f64) -> HeuristicEstimate {
    let industry = text(context, "industry");
    let channel = text(context, "channel");
    let budget = budget(context);

    let industry_factor = ctr_industry_factor(industry);
    let channel_factor = ctr_channel_factor(channel);
    let budget_factor = ctr_budget_multiplier(budget);

    HeuristicEstimate {
        value: base_ctr * industry_factor * channel_factor * budget_factor,
        explanation: vec![
            ExplanationItem::new(
                SOURCE,
                "industry_factor",
                0.3,
                format!("Industry '{}' x{}", industry.unwrap_or("unknown"), industry_factor),
            ),
            ExplanationItem::new(
                SOURCE,
                "channel_factor",
                0.4,
                format!("Channel '{}' x{}", channel.unwrap_or("unknown"), channel_factor),
            ),
            ExplanationItem::new(
                SOURCE,
                "budget_factor",
                0.3,
                format!("Budget multiplier x{}", budget_factor),
            ),
        ],
    }
}

/// `base_roi × industry × channel × budget`
pub fn estimate_roi(context: &Context, base_roi: f64) -> HeuristicEstimate {
    let industry = text(context, "industry");
    let channel = text(context, "channel");
    let budget = budget(context);

    let industry_factor = roi_industry_factor(industry);
    let channel_factor = roi_channel_factor(channel);
    let budget_factor = roi_budget_multiplier(budget);

    HeuristicEstimate {
        value: base_roi * industry_factor * channel_factor * budget_factor,
        explanation: vec![
            ExplanationItem::new(
                SOURCE,
                "industry_performance",
                0.35,
                format!("Industry '{}' x{}", industry.unwrap_or("unknown"), industry_factor),
            ),
            ExplanationItem::new(
                SOURCE,
                "channel_efficiency",
                0.3,
                format!("Channel '{}' x{}", channel.unwrap_or("unknown"), channel_factor),
            ),
            ExplanationItem::new(
                SOURCE,
                "budget_optimization",
                0.25,
                match budget {
                    Some(b) => format!("Budget {:.0} x{}", b, budget_factor),
                    None => format!("No budget given x{}", budget_factor),
                },
            ),
        ],
    }
}

/// Scoring profile of a recommendable channel
#[derive(Debug, Clone, Copy)]
pub struct ChannelProfile {
    pub name: &'static str,
    pub base_score: f64,
    pub industry_bonus: &'static [(&'static str, f64)],
    pub goal_bonus: &'static [(&'static str, f64)],
    pub age_preference: (f64, f64),
    pub pitch: &'static str,
}

pub const CHANNEL_CATALOG: [ChannelProfile; 6] = [
    ChannelProfile {
        name: "instagram",
        base_score: 0.8,
        industry_bonus: &[("retail", 0.1), ("technology", 0.05)],
        goal_bonus: &[("awareness", 0.1), ("consideration", 0.05)],
        age_preference: (18.0, 35.0),
        pitch: "Strong visual platform with an active audience in the target age group",
    },
    ChannelProfile {
        name: "facebook",
        base_score: 0.75,
        industry_bonus: &[("retail", 0.08), ("finance", 0.1)],
        goal_bonus: &[("awareness", 0.08), ("conversion", 0.1)],
        age_preference: (25.0, 55.0),
        pitch: "Broad reach with advanced targeting and analytics",
    },
    ChannelProfile {
        name: "google_ads",
        base_score: 0.85,
        industry_bonus: &[("technology", 0.1), ("finance", 0.08)],
        goal_bonus: &[("conversion", 0.15), ("consideration", 0.1)],
        age_preference: (20.0, 60.0),
        pitch: "Cost-effective intent and keyword targeting",
    },
    ChannelProfile {
        name: "tiktok",
        base_score: 0.6,
        industry_bonus: &[("retail", 0.15), ("technology", 0.1)],
        goal_bonus: &[("awareness", 0.2), ("consideration", 0.1)],
        age_preference: (16.0, 30.0),
        pitch: "Fast-growing platform with a young, engaged audience",
    },
    ChannelProfile {
        name: "linkedin",
        base_score: 0.5,
        industry_bonus: &[("technology", 0.2), ("finance", 0.15), ("education", 0.1)],
        goal_bonus: &[("consideration", 0.1), ("conversion", 0.05)],
        age_preference: (25.0, 50.0),
        pitch: "Professional network suited to B2B and educational content",
    },
    ChannelProfile {
        name: "youtube",
        base_score: 0.7,
        industry_bonus: &[("technology", 0.1), ("education", 0.15)],
        goal_bonus: &[("awareness", 0.1), ("consideration", 0.15)],
        age_preference: (18.0, 50.0),
        pitch: "Leading video platform for long-form content",
    },
];

/// `[min, max]` from `audience_age`, falling back to 25-45
fn audience_age(context: &Context) -> (f64, f64) {
    let range = context.get("audience_age").and_then(Value::as_array).and_then(|items| {
        match items {
            [lo, hi] => Some((lo.as_f64()?, hi.as_f64()?)),
            _ => None,
        }
    });
    match range {
        Some((lo, hi)) if lo <= hi => (lo, hi),
        Some((lo, hi)) => (hi, lo),
        None => DEFAULT_AUDIENCE_AGE,
    }
}

/// Share of the combined span covered by both ranges
fn age_fit(audience: (f64, f64), preference: (f64, f64)) -> f64 {
    let overlap = (audience.1.min(preference.1) - audience.0.max(preference.0)).max(0.0);
    let span = audience.1.max(preference.1) - audience.0.min(preference.0);
    if span > 0.0 {
        overlap / span
    } else {
        0.0
    }
}

/// Score one catalog channel for a campaign context
pub fn score_channel(profile: &ChannelProfile, context: &Context) -> ChannelRecommendation {
    let industry = text(context, "industry");
    let goal = text(context, "goal");
    let industry_bonus = find(profile.industry_bonus, industry).unwrap_or(0.0);
    let goal_bonus = find(profile.goal_bonus, goal).unwrap_or(0.0);

    let mut score = profile.base_score + industry_bonus + goal_bonus;
    score += age_fit(audience_age(context), profile.age_preference) * 0.1;
    match budget(context) {
        Some(b) if b > 10000.0 => score += 0.05,
        Some(b) if b < 2000.0 => score -= 0.1,
        _ => {}
    }

    let mut reason = profile.pitch.to_string();
    if let (Some(industry), true) = (industry, industry_bonus > 0.0) {
        reason.push_str(&format!(", with a strong fit for the {} industry", industry));
    }
    ChannelRecommendation::new(profile.name, score.clamp(0.0, 1.0), reason)
}

/// Every catalog channel scored for `context`, unsorted
pub fn recommend_channels(context: &Context) -> Vec<ChannelRecommendation> {
    CHANNEL_CATALOG
        .iter()
        .map(|profile| score_channel(profile, context))
        .collect()
}

/// Fixed list used when inference fails outright
pub fn fallback_channels() -> Vec<ChannelRecommendation> {
    vec![
        ChannelRecommendation::new("google_ads", 0.6, "Default recommendation"),
        ChannelRecommendation::new("facebook", 0.55, "Default recommendation"),
        ChannelRecommendation::new("instagram", 0.5, "Default recommendation"),
    ]
}
