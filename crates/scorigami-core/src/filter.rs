//! FilterKey resolution: raw filter parameters to a validated key and the
//! precomputed aggregate that answers it.
//!
//! The aggregate mapping is an exhaustive `match` over `(Sets, Sex)`.

use crate::error::{InvalidFilterError, InvalidFilterKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Match format: best of three or best of five sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sets {
    Three,
    Five,
}

impl Sets {
    pub fn as_u8(&self) -> u8 {
        match self {
            Sets::Three => 3,
            Sets::Five => 5,
        }
    }

    fn parse(raw: &str) -> Result<Self, InvalidFilterError> {
        match raw.trim() {
            "3" => Ok(Sets::Three),
            "5" => Ok(Sets::Five),
            other => Err(InvalidFilterError::new(InvalidFilterKind::BadSetsValue, other)),
        }
    }
}

/// Draw gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Men,
    Women,
    All,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Men => "men",
            Sex::Women => "women",
            Sex::All => "all",
        }
    }

    fn parse(raw: &str) -> Result<Self, InvalidFilterError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "men" => Ok(Sex::Men),
            "women" => Ok(Sex::Women),
            "all" => Ok(Sex::All),
            _ => Err(InvalidFilterError::new(InvalidFilterKind::BadSexValue, raw)),
        }
    }
}

/// Unvalidated filter parameters, as they arrive from a query string, CLI
/// flags or a parsed search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFilter {
    #[serde(default = "default_sets")]
    pub sets: String,
    #[serde(default = "default_all", alias = "gender")]
    pub sex: String,
    #[serde(default = "default_all")]
    pub year: String,
    #[serde(default = "default_all")]
    pub tournament: String,
}

fn default_sets() -> String {
    "5".to_string()
}

fn default_all() -> String {
    "all".to_string()
}

impl Default for RawFilter {
    fn default() -> Self {
        Self {
            sets: default_sets(),
            sex: default_all(),
            year: default_all(),
            tournament: default_all(),
        }
    }
}

impl RawFilter {
    pub fn new(
        sets: impl Into<String>,
        sex: impl Into<String>,
        year: impl Into<String>,
        tournament: impl Into<String>,
    ) -> Self {
        Self {
            sets: sets.into(),
            sex: sex.into(),
            year: year.into(),
            tournament: tournament.into(),
        }
    }
}

/// A validated, immutable filter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FilterKey {
    sets: Sets,
    sex: Sex,
    year: Option<i32>,
    tournament: Option<i64>,
    #[serde(skip)]
    view: AggregateView,
}

impl FilterKey {
    /// Build a key, rejecting `(Five, Women)`.
    pub fn new(
        sets: Sets,
        sex: Sex,
        year: Option<i32>,
        tournament: Option<i64>,
    ) -> Result<Self, InvalidFilterError> {
        let view = AggregateView::for_selection(sets, sex).ok_or_else(|| {
            InvalidFilterError::new(
                InvalidFilterKind::IncompatibleSexSets,
                format!("{}-{}", sets.as_u8(), sex.as_str()),
            )
        })?;
        Ok(Self {
            sets,
            sex,
            year,
            tournament,
            view,
        })
    }

    pub fn sets(&self) -> Sets {
        self.sets
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn tournament(&self) -> Option<i64> {
        self.tournament
    }

    /// No year or tournament restriction: the rollup aggregate answers it.
    pub fn use_rollup(&self) -> bool {
        self.year.is_none() && self.tournament.is_none()
    }

    pub fn view(&self) -> AggregateView {
        self.view
    }

    pub fn source(&self) -> AggregateSource {
        AggregateSource {
            view: self.view(),
            kind: if self.use_rollup() {
                AggregateKind::Rollup
            } else {
                AggregateKind::Detail
            },
        }
    }

    /// Stable 64-bit seed derived from the key (FNV-1a), identical across
    /// runs and platforms.
    pub fn seed(&self) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;

        let mut bytes = Vec::with_capacity(24);
        bytes.push(self.sets.as_u8());
        bytes.extend_from_slice(self.sex.as_str().as_bytes());
        bytes.extend_from_slice(&self.year.map(i64::from).unwrap_or(i64::MIN).to_le_bytes());
        bytes.extend_from_slice(&self.tournament.unwrap_or(i64::MIN).to_le_bytes());

        bytes.iter().fold(OFFSET, |hash, b| {
            (hash ^ u64::from(*b)).wrapping_mul(PRIME)
        })
    }

    /// Query-string form understood by the HTTP endpoints.
    pub fn to_query_string(&self) -> String {
        format!(
            "sets={}&sex={}&year={}&tournament={}",
            self.sets.as_u8(),
            self.sex.as_str(),
            self.year.map(|y| y.to_string()).unwrap_or_else(default_all),
            self.tournament
                .map(|t| t.to_string())
                .unwrap_or_else(default_all),
        )
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.sets.as_u8(), self.sex.as_str())?;
        match self.year {
            Some(y) => write!(f, "/{}", y)?,
            None => write!(f, "/all")?,
        }
        match self.tournament {
            Some(t) => write!(f, "/{}", t),
            None => write!(f, "/all"),
        }
    }
}

/// The `(sets, sex)` family of precomputed aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateView {
    ThreeMen,
    ThreeWomen,
    ThreeAll,
    FiveMen,
}

impl AggregateView {
    /// Route a selection to its aggregate. Best-of-five is men-only, so
    /// `(Five, All)` shares the men's aggregate and `(Five, Women)` has none.
    pub fn for_selection(sets: Sets, sex: Sex) -> Option<Self> {
        match (sets, sex) {
            (Sets::Three, Sex::Men) => Some(AggregateView::ThreeMen),
            (Sets::Three, Sex::Women) => Some(AggregateView::ThreeWomen),
            (Sets::Three, Sex::All) => Some(AggregateView::ThreeAll),
            (Sets::Five, Sex::Men) | (Sets::Five, Sex::All) => Some(AggregateView::FiveMen),
            (Sets::Five, Sex::Women) => None,
        }
    }

    pub fn all() -> [AggregateView; 4] {
        [
            AggregateView::ThreeMen,
            AggregateView::ThreeWomen,
            AggregateView::ThreeAll,
            AggregateView::FiveMen,
        ]
    }

    fn stem(&self) -> &'static str {
        match self {
            AggregateView::ThreeMen => "3_men",
            AggregateView::ThreeWomen => "3_women",
            AggregateView::ThreeAll => "3",
            AggregateView::FiveMen => "5_men",
        }
    }
}

/// Rollup (unfiltered) or detail (per-event, joinable) aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateKind {
    Rollup,
    Detail,
}

/// A concrete aggregate source: which view family and which flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateSource {
    pub view: AggregateView,
    pub kind: AggregateKind,
}

impl AggregateSource {
    /// Relation holding node rows for this source.
    pub fn nodes_relation(&self) -> String {
        self.relation("nodes", self.kind)
    }

    /// Relation holding edge rows for this source.
    pub fn edges_relation(&self) -> String {
        self.relation("edges", self.kind)
    }

    /// Rollup node relation of the same view, used as the base of a
    /// detail query so that unplayed sequences are still listed.
    pub fn base_nodes_relation(&self) -> String {
        self.relation("nodes", AggregateKind::Rollup)
    }

    fn relation(&self, table: &str, kind: AggregateKind) -> String {
        match kind {
            AggregateKind::Rollup => format!("mv_graph_{}_{}_all", table, self.view.stem()),
            AggregateKind::Detail => format!("mv_graph_{}_{}", table, self.view.stem()),
        }
    }
}

impl fmt::Display for AggregateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nodes_relation())
    }
}

/// Output of [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFilter {
    pub key: FilterKey,
    pub use_rollup: bool,
    pub source: AggregateSource,
}

impl From<FilterKey> for ResolvedFilter {
    fn from(key: FilterKey) -> Self {
        Self {
            key,
            use_rollup: key.use_rollup(),
            source: key.source(),
        }
    }
}

/// Validate raw parameters and pick the aggregate that answers them.
///
/// `"all"` (any case) or an empty string means "no restriction" for year
/// and tournament.
pub fn resolve(raw: &RawFilter) -> Result<ResolvedFilter, InvalidFilterError> {
    let year = parse_optional::<i32>(&raw.year, InvalidFilterKind::NonNumericYear)?;
    let tournament =
        parse_optional::<i64>(&raw.tournament, InvalidFilterKind::NonNumericTournament)?;
    let sets = Sets::parse(&raw.sets)?;
    let sex = Sex::parse(&raw.sex)?;

    let key = FilterKey::new(sets, sex, year, tournament)?;
    Ok(ResolvedFilter::from(key))
}

fn parse_optional<T: std::str::FromStr>(
    raw: &str,
    kind: InvalidFilterKind,
) -> Result<Option<T>, InvalidFilterError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| InvalidFilterError::new(kind, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(sets: &str, sex: &str, year: &str, tournament: &str) -> RawFilter {
        RawFilter::new(sets, sex, year, tournament)
    }

    #[test]
    fn women_best_of_five_is_incompatible() {
        let err = resolve(&raw("5", "women", "2019", "all")).unwrap_err();
        assert_eq!(err.kind, InvalidFilterKind::IncompatibleSexSets);
    }

    #[test]
    fn bad_values_report_their_kind() {
        let cases = [
            (raw("4", "all", "all", "all"), InvalidFilterKind::BadSetsValue),
            (raw("3", "mixed", "all", "all"), InvalidFilterKind::BadSexValue),
            (raw("3", "men", "20x9", "all"), InvalidFilterKind::NonNumericYear),
            (raw("3", "men", "all", "wimbledon"), InvalidFilterKind::NonNumericTournament),
        ];
        for (input, kind) in cases {
            assert_eq!(resolve(&input).unwrap_err().kind, kind, "{:?}", input);
        }
    }

    #[test]
    fn unrestricted_filter_uses_rollup() {
        let r = resolve(&RawFilter::default()).unwrap();
        assert!(r.use_rollup);
        assert_eq!(r.source.kind, AggregateKind::Rollup);
        assert_eq!(r.source.nodes_relation(), "mv_graph_nodes_5_men_all");
        assert_eq!(r.source.edges_relation(), "mv_graph_edges_5_men_all");
    }

    #[test]
    fn year_or_tournament_forces_detail() {
        let r = resolve(&raw("3", "WOMEN", "2021", "all")).unwrap();
        assert!(!r.use_rollup);
        assert_eq!(r.key.year(), Some(2021));
        assert_eq!(r.source.nodes_relation(), "mv_graph_nodes_3_women");
        assert_eq!(r.source.base_nodes_relation(), "mv_graph_nodes_3_women_all");

        let r = resolve(&raw("3", "all", "", "560")).unwrap();
        assert_eq!(r.key.tournament(), Some(560));
        assert_eq!(r.source.edges_relation(), "mv_graph_edges_3");
    }

    #[test]
    fn five_all_shares_the_mens_aggregate() {
        let all = resolve(&raw("5", "all", "all", "all")).unwrap();
        let men = resolve(&raw("5", "men", "all", "all")).unwrap();
        assert_eq!(all.source, men.source);
        assert_ne!(all.key, men.key);
    }

    #[test]
    fn seed_is_stable_and_key_sensitive() {
        let a = resolve(&raw("3", "men", "2019", "all")).unwrap().key;
        let b = resolve(&raw("3", "men", "2019", "all")).unwrap().key;
        let c = resolve(&raw("3", "men", "2020", "all")).unwrap().key;
        assert_eq!(a.seed(), b.seed());
        assert_ne!(a.seed(), c.seed());
    }

    #[test]
    fn query_string_round_trips_through_resolve() {
        let key = resolve(&raw("3", "women", "2018", "42")).unwrap().key;
        assert_eq!(key.to_query_string(), "sets=3&sex=women&year=2018&tournament=42");
        assert_eq!(key.to_string(), "3-women/2018/42");
    }
}
