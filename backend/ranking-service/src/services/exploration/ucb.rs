// ============================================
// UCB (Upper Confidence Bound) Explorer
// ============================================
//
// Multi-armed bandit algorithm for explore-exploit balance
//
// UCB1 Formula:
//   UCB(i) = avg_reward(i) + c * sqrt(2 * ln(N) / n(i))
//
// Where:
//   - avg_reward(i): average engagement rate for content i
//   - c: exploration constant (default: sqrt(2) ≈ 1.414)
//   - N: total impressions across all content
//   - n(i): impressions for content i
//
// Higher UCB = more likely to be selected for display

use tracing::{debug, info};
use uuid::Uuid;

/// UCB Explorer for content exploration
pub struct UCBExplorer {
    /// Exploration constant (c in UCB formula)
    /// Higher = more exploration, lower = more exploitation
    exploration_constant: f64,
    /// Minimum impressions before content can graduate
    min_impressions_to_graduate: u32,
    /// Minimum engagement rate to graduate
    min_engagement_rate_to_graduate: f64,
    /// Maximum impressions in exploration pool
    max_exploration_impressions: u32,
}

impl Default for UCBExplorer {
    fn default() -> Self {
        Self {
            exploration_constant: 1.414, // sqrt(2)
            min_impressions_to_graduate: 100,
            min_engagement_rate_to_graduate: 0.02, // 2% engagement
            max_exploration_impressions: 1000,
        }
    }
}

impl UCBExplorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom exploration constant
    pub fn with_exploration_constant(mut self, c: f64) -> Self {
        self.exploration_constant = c;
        self
    }

    /// Create with custom graduation thresholds
    pub fn with_graduation_thresholds(
        mut self,
        min_impressions: u32,
        min_engagement_rate: f64,
    ) -> Self {
        self.min_impressions_to_graduate = min_impressions;
        self.min_engagement_rate_to_graduate = min_engagement_rate;
        self
    }

    /// Compute UCB score for a content item
    ///
    /// # Arguments
    /// * `impressions` - Number of times content was shown
    /// * `engagements` - Number of positive engagements (likes, comments, shares, completions)
    /// * `total_impressions` - Total impressions across all exploration content
    ///
    /// # Returns
    /// UCB score (higher = should be shown more)
    pub fn ucb_score(&self, impressions: u32, engagements: u32, total_impressions: u32) -> f64 {
        // New content with no impressions gets maximum exploration bonus
        if impressions == 0 {
            return f64::MAX;
        }

        // Exploitation term: average engagement rate
        let exploit = engagements as f64 / impressions as f64;

        // Exploration term: uncertainty bonus
        let explore = if total_impressions > 0 {
            self.exploration_constant
                * ((2.0 * (total_impressions as f64).ln()) / impressions as f64).sqrt()
        } else {
            self.exploration_constant
        };

        debug!(
            impressions = impressions,
            engagements = engagements,
            exploit = exploit,
            explore = explore,
            "UCB components computed"
        );

        exploit + explore
    }

    /// Check if content should graduate from exploration pool
    ///
    /// Graduation criteria:
    /// 1. Has sufficient impressions (min_impressions_to_graduate)
    /// 2. AND engagement rate >= min_engagement_rate_to_graduate
    /// OR
    /// 3. Has exceeded max_exploration_impressions (force graduate with final score)
    pub fn should_graduate(&self, impressions: u32, engagements: u32) -> GraduationDecision {
        let engagement_rate = if impressions > 0 {
            engagements as f64 / impressions as f64
        } else {
            0.0
        };

        // Force graduation if max impressions exceeded
        if impressions >= self.max_exploration_impressions {
            return GraduationDecision::Graduate {
                reason: GraduationReason::MaxImpressionsReached,
                final_score: engagement_rate,
            };
        }

        // Not enough data yet
        if impressions < self.min_impressions_to_graduate {
            return GraduationDecision::ContinueExploration {
                remaining_impressions: self.min_impressions_to_graduate - impressions,
            };
        }

        // Check engagement threshold
        if engagement_rate >= self.min_engagement_rate_to_graduate {
            GraduationDecision::Graduate {
                reason: GraduationReason::SufficientEngagement,
                final_score: engagement_rate,
            }
        } else {
            // Poor performance, demote/archive
            GraduationDecision::Demote {
                reason: DemotionReason::LowEngagement,
                final_score: engagement_rate,
            }
        }
    }

    /// Select content from exploration pool using UCB
    ///
    /// # Arguments
    /// * `pool` - List of (content_id, impressions, engagements)
    /// * `count` - Number of items to select
    ///
    /// # Returns
    /// Selected content IDs sorted by UCB score
    pub fn select_for_exploration(&self, pool: &[(Uuid, u32, u32)], count: usize) -> Vec<Uuid> {
        if pool.is_empty() || count == 0 {
            return Vec::new();
        }

        // Calculate total impressions
        let total_impressions: u32 = pool.iter().map(|(_, imp, _)| *imp).sum();

        // Score all content with UCB
        let mut scored: Vec<(Uuid, f64)> = pool
            .iter()
            .map(|(id, imp, eng)| (*id, self.ucb_score(*imp, *eng, total_impressions)))
            .collect();

        // Sort by UCB score descending
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        info!(
            pool_size = pool.len(),
            selected = count.min(scored.len()),
            total_impressions = total_impressions,
            "UCB selection completed"
        );

        scored.into_iter().take(count).map(|(id, _)| id).collect()
    }

    /// Compute Thompson Sampling score (alternative to UCB)
    /// Uses Beta distribution for Bayesian exploration
    ///
    /// Beta(α, β) where:
    /// - α = engagements + 1 (successes)
    /// - β = impressions - engagements + 1 (failures)
    pub fn thompson_sample(&self, impressions: u32, engagements: u32) -> f64 {
        // Use mean of Beta distribution as deterministic approximation
        // Mean = α / (α + β)
        let alpha = engagements as f64 + 1.0;
        let beta = (impressions - engagements) as f64 + 1.0;
        alpha / (alpha + beta)
    }
}

/// Decision for content graduation from exploration pool
#[derive(Debug, Clone)]
pub enum GraduationDecision {
    /// Content should graduate to main ranking pool
    Graduate {
        reason: GraduationReason,
        final_score: f64,
    },
    /// Content should continue in exploration
    ContinueExploration { remaining_impressions: u32 },
    /// Content should be demoted/archived
    Demote {
        reason: DemotionReason,
        final_score: f64,
    },
}

#[derive(Debug, Clone)]
pub enum GraduationReason {
    SufficientEngagement,
    MaxImpressionsReached,
}

#[derive(Debug, Clone)]
pub enum DemotionReason {
    LowEngagement,
    PolicyViolation,
}
