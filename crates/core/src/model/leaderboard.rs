use serde::{Deserialize, Serialize};

use crate::model::ids::CompetitionId;

/// One participant's submitted attempt in a competition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub participant: String,
    pub score: u32,
    pub total: u32,
    /// Time taken, in seconds.
    pub duration_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub rank: u32,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}

/// Ranked standings for a competition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    competition_id: CompetitionId,
    entries: Vec<RankedEntry>,
}

impl Leaderboard {
    /// Rank entries: higher score first, then faster time, then participant name.
    ///
    /// Entries tied on both score and time share a rank and the next rank skips
    /// ahead ("1, 2, 2, 4").
    #[must_use]
    pub fn rank(competition_id: CompetitionId, mut entries: Vec<LeaderboardEntry>) -> Self {
        entries.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(a.duration_secs.cmp(&b.duration_secs))
                .then_with(|| a.participant.cmp(&b.participant))
        });

        let mut ranked: Vec<RankedEntry> = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.into_iter().enumerate() {
            let rank = match ranked.last() {
                Some(prev)
                    if prev.entry.score == entry.score
                        && prev.entry.duration_secs == entry.duration_secs =>
                {
                    prev.rank
                }
                _ => u32::try_from(idx + 1).unwrap_or(u32::MAX),
            };
            ranked.push(RankedEntry { rank, entry });
        }

        Self {
            competition_id,
            entries: ranked,
        }
    }

    #[must_use]
    pub fn competition_id(&self) -> &CompetitionId {
        &self.competition_id
    }

    #[must_use]
    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    /// First ranked entry for `participant`, if they submitted.
    #[must_use]
    pub fn position_of(&self, participant: &str) -> Option<&RankedEntry> {
        self.entries
            .iter()
            .find(|ranked| ranked.entry.participant == participant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, score: u32, secs: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            participant: name.into(),
            score,
            total: 20,
            duration_secs: secs,
        }
    }

    #[test]
    fn ranks_by_score_then_time_with_shared_ties() {
        let board = Leaderboard::rank(
            CompetitionId::new("cmp"),
            vec![
                entry("dee", 15, 300),
                entry("ada", 18, 400),
                entry("cy", 15, 300),
                entry("bo", 15, 250),
                entry("eve", 10, 100),
            ],
        );

        let got: Vec<(u32, &str)> = board
            .entries()
            .iter()
            .map(|r| (r.rank, r.entry.participant.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![(1, "ada"), (2, "bo"), (3, "cy"), (3, "dee"), (5, "eve")]
        );
        assert_eq!(board.position_of("dee").map(|r| r.rank), Some(3));
        assert!(board.position_of("zed").is_none());
    }

    #[test]
    fn empty_board() {
        let board = Leaderboard::rank(CompetitionId::new("cmp"), Vec::new());
        assert!(board.entries().is_empty());
    }
}
