use crate::matches::Match;

/// Derives statistics for a match and turns it into its display form.
/// Both steps mutate the match in place.
pub trait MatchRenderer: Send + Sync {
    fn compute_match_data(&self, m: &mut Match);
    fn render_match(&self, m: &mut Match);
}
