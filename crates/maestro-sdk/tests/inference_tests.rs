//! End-to-end tier selection of the hybrid inference engine

mod common;

use chrono::Utc;
use common::{
    ctx, rule, BrokenModel, ConstantModel, EchoModel, PanickingModel, ReadOnlyRepository, TestEngine,
};
use maestro_core::{RuleActions, RuleFeedback, RuleMatch};
use maestro_ml::{CoercionMode, ModelFeedback, ModelKind, ModelStore};
use maestro_repository::{MemoryRuleRepository, RuleRecord};
use maestro_sdk::{
    DynamicKnowledgeBase, FeedbackBatch, HybridInferenceEngine, InferenceConfig, Method,
};
use serde_json::json;
use std::sync::Arc;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test]
async fn test_ctr_from_knowledge_rules() {
    let t = TestEngine::new();
    t.add(rule(
        "tech",
        "ctr_prediction",
        json!({"field": "industry", "value": "technology"}),
        json!({"ctr": 0.08}),
    ))
    .await;

    let result = t
        .engine
        .predict_ctr(&ctx(json!({"industry": "technology", "budget": 1000})))
        .await;
    assert_eq!(result.method, Method::KnowledgeRules);
    assert!(approx(result.prediction, 0.08));
    assert_eq!(result.confidence, 0.9);
    assert_eq!(result.explanation[0].source, "knowledge_rules");
    assert_eq!(result.explanation[0].factor, "tech");
}

#[tokio::test]
async fn test_ctr_heuristic_when_nothing_else_answers() {
    let t = TestEngine::new();
    let result = t
        .engine
        .predict_ctr(&ctx(json!({"industry": "food", "channel": "display", "budget": 1000})))
        .await;

    assert_eq!(result.method, Method::Heuristic);
    assert!(approx(result.prediction, 0.05 * 0.9 * 0.8 * 1.0));
    assert_eq!(result.confidence, 0.6);

    let insights = result.insights.expect("rate predictions carry insights");
    assert_eq!(insights.benchmark, 0.025);
    assert_eq!(insights.trend.len(), 6);
    assert_eq!(insights.factors.len(), result.explanation.len());
}

#[tokio::test]
async fn test_ctr_from_model_when_no_rule_matches() {
    let t = TestEngine::new();
    t.add(rule(
        "retail",
        "ctr_prediction",
        json!({"field": "industry", "value": "retail"}),
        json!({"ctr": 0.03}),
    ))
    .await;
    t.install_model(ModelKind::Ctr, ConstantModel { value: 0.04, n_features: 1 }, &["budget"])
        .await;

    let result = t
        .engine
        .predict_ctr(&ctx(json!({"industry": "technology", "budget": 1000})))
        .await;
    assert_eq!(result.method, Method::MlModel);
    assert!(approx(result.prediction, 0.04));
    assert_eq!(result.confidence, 0.7);
    assert_eq!(result.explanation[0].factor, "model_prediction");
}

#[tokio::test]
async fn test_insufficient_features_fall_through_to_heuristic() {
    let t = TestEngine::new();
    t.install_model(ModelKind::Ctr, PanickingModel { n_features: 2 }, &["budget", "audience_size"])
        .await;

    let result = t.engine.predict_ctr(&ctx(json!({"budget": 1000}))).await;
    assert_eq!(result.method, Method::Heuristic);
}

#[tokio::test]
async fn test_unexpected_model_error_uses_fallback() {
    let t = TestEngine::new();
    t.install_model(ModelKind::Ctr, BrokenModel, &["budget"]).await;

    let result = t.engine.predict_ctr(&ctx(json!({"budget": 1000}))).await;
    assert_eq!(result.method, Method::Fallback);
    assert_eq!(result.prediction, 0.02);
    assert_eq!(result.confidence, 0.3);
    assert!(result.explanation[0].description.contains("weights corrupted"));

    let roi = {
        t.install_model(ModelKind::Roi, BrokenModel, &["budget"]).await;
        t.engine.predict_roi(&ctx(json!({"budget": 1000}))).await
    };
    assert_eq!(roi.method, Method::Fallback);
    assert_eq!(roi.prediction, 1.0);
}

#[tokio::test]
async fn test_ctr_always_within_unit_interval() {
    let t = TestEngine::new();
    t.add(rule(
        "overshoot",
        "ctr_prediction",
        json!({"field": "industry", "value": "video_games"}),
        json!({"ctr": 1.7}),
    ))
    .await;
    t.add(rule(
        "negative",
        "ctr_prediction",
        json!({"field": "industry", "value": "mining"}),
        json!({"prediction": -0.4}),
    ))
    .await;

    let contexts = [
        json!({"industry": "video_games"}),
        json!({"industry": "mining"}),
        json!({"industry": "technology", "channel": "video", "budget": 1e9}),
        json!({}),
        json!({"budget": "not a number"}),
    ];
    for context in contexts {
        let result = t.engine.predict_ctr(&ctx(context.clone())).await;
        assert!(
            (0.0..=1.0).contains(&result.prediction),
            "{} gave {}",
            context,
            result.prediction
        );
    }
}

#[tokio::test]
async fn test_blending_rules_with_model() {
    let config = InferenceConfig {
        blend_rules_with_model: true,
        ..InferenceConfig::default()
    };
    let t = TestEngine::with_config(config);
    t.add(rule(
        "tech",
        "ctr_prediction",
        json!({"field": "industry", "value": "technology"}),
        json!({"ctr": 0.08}),
    ))
    .await;

    let context = ctx(json!({"industry": "technology", "budget": 1000}));
    let rules_only = t.engine.predict_ctr(&context).await;
    assert_eq!(rules_only.method, Method::KnowledgeRules);

    t.install_model(ModelKind::Ctr, ConstantModel { value: 0.04, n_features: 1 }, &["budget"])
        .await;
    let blended = t.engine.predict_ctr(&context).await;
    assert_eq!(blended.method, Method::Hybrid);
    assert!(approx(blended.prediction, 0.7 * 0.04 + 0.3 * 0.08));
    assert!(approx(blended.confidence, 0.8));
    assert_eq!(blended.explanation.len(), 2);
}

#[tokio::test]
async fn test_roi_tiers() {
    let t = TestEngine::new();
    let heuristic = t
        .engine
        .predict_roi(&ctx(json!({"industry": "technology", "channel": "email", "budget": 20000})))
        .await;
    assert_eq!(heuristic.method, Method::Heuristic);
    assert!(approx(heuristic.prediction, 2.0 * 1.3 * 1.4 * 1.2));
    assert_eq!(heuristic.insights.unwrap().benchmark, 2.1);

    t.add(rule(
        "email",
        "roi_prediction",
        json!({"field": "channel", "value": "email"}),
        json!({"prediction": 3.0, "weight": 3.0}),
    ))
    .await;
    t.add(rule(
        "big budget",
        "roi_prediction",
        json!({"field": "budget", "operator": "gt", "value": 10000}),
        json!({"prediction": 5.0}),
    ))
    .await;
    let ruled = t
        .engine
        .predict_roi(&ctx(json!({"channel": "email", "budget": 20000})))
        .await;
    assert_eq!(ruled.method, Method::KnowledgeRules);
    assert!(approx(ruled.prediction, (3.0 * 3.0 + 5.0) / 4.0));
}

#[tokio::test]
async fn test_roi_is_not_capped() {
    let t = TestEngine::new();
    t.install_model(ModelKind::Roi, ConstantModel { value: 7.5, n_features: 1 }, &["budget"])
        .await;
    let result = t.engine.predict_roi(&ctx(json!({"budget": 100}))).await;
    assert_eq!(result.method, Method::MlModel);
    assert_eq!(result.prediction, 7.5);
}

#[tokio::test]
async fn test_channels_from_rules_deduplicated_and_sorted() {
    let t = TestEngine::new();
    t.add(rule(
        "b2b",
        "channel_recommendation",
        json!({"field": "industry", "value": "technology"}),
        json!({"recommended_channels": ["linkedin", "email"], "score": 0.9, "reason": "B2B reach"}),
    ))
    .await;
    t.add(rule(
        "newsletter",
        "channel_recommendation",
        json!({"field": "industry", "value": "technology"}),
        json!({"recommended_channels": ["email", "facebook"]}),
    ))
    .await;

    let result = t
        .engine
        .recommend_channels(&ctx(json!({"industry": "technology"})))
        .await;
    assert_eq!(result.method, Method::KnowledgeRules);
    assert_eq!(result.confidence, 0.9);

    let channels: Vec<&str> = result.recommendations.iter().map(|r| r.channel.as_str()).collect();
    assert_eq!(channels, vec!["linkedin", "email", "facebook"]);
    assert_eq!(result.recommendations[1].score, 0.9);
    assert_eq!(result.recommendations[2].reason, "Based on rule: newsletter");
}

#[tokio::test]
async fn test_heuristic_channels_ranked() {
    let t = TestEngine::new();
    let result = t
        .engine
        .recommend_channels(&ctx(json!({
            "industry": "technology",
            "goal": "consideration",
            "budget": 20000,
            "audience_age": [25, 40]
        })))
        .await;

    assert_eq!(result.method, Method::Heuristic);
    assert_eq!(result.confidence, 0.6);
    assert_eq!(result.recommendations.len(), 5);
    for pair in result.recommendations.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert_eq!(result.recommendations[0].channel, "google_ads");
}

#[tokio::test]
async fn test_channel_model_scores_one_hot_candidates() {
    let t = TestEngine::new();
    t.install_model(ModelKind::Channel, EchoModel { n_features: 1 }, &["channel_is_youtube"])
        .await;

    let result = t.engine.recommend_channels(&ctx(json!({"industry": "retail"}))).await;
    assert_eq!(result.method, Method::MlModel);
    assert_eq!(result.recommendations[0].channel, "youtube");
    assert_eq!(result.recommendations[0].score, 1.0);
    assert!(result.recommendations[1..].iter().all(|r| r.score == 0.0));
}

#[tokio::test]
async fn test_channel_model_failure_uses_fallback_list() {
    let t = TestEngine::new();
    t.install_model(ModelKind::Channel, BrokenModel, &["budget"]).await;

    let result = t.engine.recommend_channels(&ctx(json!({"budget": 500}))).await;
    assert_eq!(result.method, Method::Fallback);
    assert_eq!(result.confidence, 0.3);
    assert!(!result.recommendations.is_empty());
    for pair in result.recommendations.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_channel_recommendations_truncated() {
    let config = InferenceConfig {
        max_channel_recommendations: 2,
        ..InferenceConfig::default()
    };
    let t = TestEngine::with_config(config);
    let result = t.engine.recommend_channels(&ctx(json!({}))).await;
    assert_eq!(result.recommendations.len(), 2);
}

#[tokio::test]
async fn test_combine_predictions() {
    let t = TestEngine::new();
    let matches = vec![RuleMatch {
        rule_id: 1,
        rule_name: "r".to_string(),
        actions: RuleActions::from_json(&json!({"prediction": 0.1, "weight": 2.0})),
    }];
    let blended = t.engine.combine_predictions(&matches, Some(0.2)).unwrap();
    assert!(approx(blended, 0.7 * 0.2 + 0.3 * 0.1));
    assert_eq!(t.engine.combine_predictions(&[], None), None);
}

#[tokio::test]
async fn test_feedback_batch_routes_both_kinds() {
    let t = TestEngine::new();
    let id = t
        .add(
            rule(
                "tech",
                "ctr_prediction",
                json!({"field": "industry", "value": "technology"}),
                json!({"ctr": 0.08}),
            )
            .with_priority(2),
        )
        .await;

    let batch = FeedbackBatch {
        rule_feedback: vec![RuleFeedback::useful(id), RuleFeedback::useful(404)],
        ml_feedback: vec![ModelFeedback {
            model: ModelKind::Ctr,
            predicted: 0.05,
            actual: 0.07,
        }],
    };
    assert!(t.engine.update_from_feedback(&batch).await);

    assert_eq!(t.knowledge_base.get_rule(id).await.unwrap().priority, 3);
    let report = t.models.performance_report().await;
    assert_eq!(report.feedback[&ModelKind::Ctr].count, 1);
    assert!(report.loaded_models.is_empty());
}

#[tokio::test]
async fn test_feedback_batch_reports_storage_failure() {
    let now = Utc::now();
    let repo = ReadOnlyRepository {
        inner: MemoryRuleRepository::with_records(vec![RuleRecord::from_new(
            1,
            rule("a", "ctr_prediction", json!({"field": "a", "value": 1}), json!({"ctr": 0.1})),
            now,
        )]),
    };
    let knowledge_base = Arc::new(DynamicKnowledgeBase::new(Arc::new(repo)));
    knowledge_base.load().await;
    let models = Arc::new(ModelStore::new("unused", CoercionMode::Strict));
    let engine = HybridInferenceEngine::new(knowledge_base, models.clone(), InferenceConfig::default());

    let batch = FeedbackBatch {
        rule_feedback: vec![RuleFeedback::useful(1)],
        ml_feedback: vec![ModelFeedback {
            model: ModelKind::Roi,
            predicted: 2.0,
            actual: 2.5,
        }],
    };
    assert!(!engine.update_from_feedback(&batch).await);
    assert_eq!(models.performance_report().await.feedback[&ModelKind::Roi].count, 1);
}

#[tokio::test]
async fn test_status_combines_both_stores() {
    let t = TestEngine::new();
    t.add(rule("a", "ctr_prediction", json!({"field": "a", "value": 1}), json!({"ctr": 0.1})))
        .await;
    t.install_model(ModelKind::Roi, ConstantModel { value: 1.0, n_features: 1 }, &["budget"])
        .await;

    let status = t.engine.status().await;
    assert_eq!(status.knowledge_base.rule_count, 1);
    assert_eq!(status.models.loaded_models, vec![ModelKind::Roi]);
}
