use crate::error::Result;
use crate::models::Post;
use crate::services::selection::SelectionMethod;
use crate::storage::{Comparison, Field, FieldValue, Selector, SortDirection, SortSpec};
use serde::{Deserialize, Serialize};

/// Parameterized score-and-select algorithm over recommendable posts.
///
/// Each post is weighted by
/// `max(0, sectionModifier + (baseScore - scoreOffset)^scoreExponent)`,
/// where the section modifier depends on whether the post is curated,
/// frontpage, or a personal blogpost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecommendationAlgorithm {
    pub method: String,
    pub score_offset: f64,
    pub score_exponent: f64,
    pub personal_blogpost_modifier: f64,
    pub frontpage_modifier: f64,
    pub curated_modifier: f64,
    pub only_unread: bool,
    pub include_personal: bool,
    pub exclude_default_recommendations: bool,
    /// Falls back to the configured minimum when unset.
    pub minimum_base_score: Option<f64>,
}

impl Default for RecommendationAlgorithm {
    fn default() -> Self {
        Self {
            method: SelectionMethod::Sample.as_str().to_string(),
            score_offset: 0.0,
            score_exponent: 3.0,
            personal_blogpost_modifier: 0.0,
            frontpage_modifier: 10.0,
            curated_modifier: 50.0,
            only_unread: true,
            include_personal: false,
            exclude_default_recommendations: false,
            minimum_base_score: None,
        }
    }
}

impl RecommendationAlgorithm {
    pub fn method(&self) -> Result<SelectionMethod> {
        self.method.parse()
    }

    pub fn section_modifier(&self, post: &Post) -> f64 {
        if post.curated_date.is_some() {
            self.curated_modifier
        } else if post.frontpage_date.is_some() {
            self.frontpage_modifier
        } else {
            self.personal_blogpost_modifier
        }
    }

    /// Never negative. An undefined power (negative base, fractional
    /// exponent) scores zero.
    pub fn score(&self, post: &Post) -> f64 {
        let weight = self.section_modifier(post)
            + (post.base_score - self.score_offset).powf(self.score_exponent);
        weight.max(0.0)
    }

    /// Posts eligible for recommendation to `viewer`.
    pub fn candidate_selector(&self, viewer: Option<&str>, default_minimum: f64) -> Selector {
        let minimum = self.minimum_base_score.unwrap_or(default_minimum);

        let inclusion = if self.include_personal {
            Selector::All
        } else {
            Selector::Exists(Field::FrontpageDate)
        };

        let recommendable = Selector::Published
            .and(Selector::compare(
                Field::BaseScore,
                Comparison::Gt,
                FieldValue::Number(minimum),
            ))
            .and(inclusion)
            .and(Selector::RecommendationsEnabled);

        let eligible = if self.exclude_default_recommendations {
            recommendable
        } else {
            recommendable.or(Selector::Published.and(Selector::DefaultRecommendation))
        };

        match viewer {
            Some(viewer) if self.only_unread => eligible.and(Selector::UnreadBy(viewer.to_string())),
            _ => eligible,
        }
    }

    /// Store order for the hydrated winners.
    pub fn hydrate_sort(&self, method: SelectionMethod) -> Vec<SortSpec> {
        let mut sort = vec![SortSpec {
            field: Field::DefaultRecommendation,
            direction: SortDirection::Desc,
        }];
        if method == SelectionMethod::Top {
            sort.push(SortSpec {
                field: Field::BaseScore,
                direction: SortDirection::Desc,
            });
        }
        sort
    }
}
