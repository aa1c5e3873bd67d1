//! Debates, together with the teams and adjudicators allocated to them.
//!
//! Draw generation and allocation happen elsewhere; this module only reads
//! what has been allocated.

use std::collections::HashMap;

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    schema::{
        tournament_debate_adjudicators, tournament_debate_teams,
        tournament_debates, tournament_rounds,
    },
    tournaments::rounds::Round,
};

#[derive(Queryable, Serialize, Deserialize, Clone, Debug)]
pub struct Debate {
    pub id: String,
    pub tournament_id: String,
    pub round_id: String,
    pub number: i64,
    pub bracket: i64,
}

#[derive(Queryable, Serialize, Deserialize, Clone, Debug)]
pub struct DebateTeam {
    pub id: String,
    pub debate_id: String,
    pub team_id: String,
    pub side: i64,
    pub points: Option<i64>,
    pub score: Option<f64>,
}

#[derive(Queryable, Serialize, Deserialize, Clone, Debug)]
pub struct DebateAdjudicator {
    pub id: String,
    pub debate_id: String,
    pub adjudicator_id: String,
    pub role: String,
}

impl DebateAdjudicator {
    pub fn role(&self) -> AdjudicatorRole {
        AdjudicatorRole::from_code(&self.role)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdjudicatorRole {
    Chair,
    Panellist,
    Trainee,
}

impl AdjudicatorRole {
    pub const ALL: [AdjudicatorRole; 3] = [
        AdjudicatorRole::Chair,
        AdjudicatorRole::Panellist,
        AdjudicatorRole::Trainee,
    ];

    /// Unknown codes are treated as panellists; the database only admits
    /// `c`, `p` and `t`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "c" => AdjudicatorRole::Chair,
            "t" => AdjudicatorRole::Trainee,
            _ => AdjudicatorRole::Panellist,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AdjudicatorRole::Chair => "c",
            AdjudicatorRole::Panellist => "p",
            AdjudicatorRole::Trainee => "t",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            AdjudicatorRole::Chair => "Chair",
            AdjudicatorRole::Panellist => "Panellist",
            AdjudicatorRole::Trainee => "Trainee",
        }
    }
}

#[derive(Clone, Debug)]
pub struct DebateInfo {
    pub debate: Debate,
    pub round: Round,
    /// Ordered by side.
    pub teams: Vec<DebateTeam>,
    pub adjudicators: Vec<DebateAdjudicator>,
}

impl DebateInfo {
    pub fn chair(&self) -> Option<&DebateAdjudicator> {
        self.adjudicators
            .iter()
            .find(|adj| adj.role() == AdjudicatorRole::Chair)
    }

    /// Panellists and trainees.
    pub fn wings(&self) -> impl Iterator<Item = &DebateAdjudicator> {
        self.adjudicators
            .iter()
            .filter(|adj| adj.role() != AdjudicatorRole::Chair)
    }

    pub fn role_of(&self, adj_id: &str) -> Option<AdjudicatorRole> {
        self.adjudicators
            .iter()
            .find(|adj| adj.adjudicator_id == adj_id)
            .map(|adj| adj.role())
    }

    pub fn has_team(&self, team_id: &str) -> bool {
        self.teams.iter().any(|team| team.team_id == team_id)
    }

    /// The difference between the two highest team scores, once every team
    /// has a score.
    pub fn margin(&self) -> Option<f64> {
        let mut scores = self.scores()?;
        if scores.len() < 2 {
            return None;
        }
        scores.sort_by(|a, b| b.total_cmp(a));
        Some(scores[0] - scores[1])
    }

    pub fn average_score(&self) -> Option<f64> {
        let scores = self.scores()?;
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }

    fn scores(&self) -> Option<Vec<f64>> {
        self.teams.iter().map(|team| team.score).collect()
    }

    /// A short description of how a team did in this debate, for example
    /// `won` or `lost` in a two-team debate.
    pub fn result_of(&self, team_id: &str) -> String {
        let Some(team) = self.teams.iter().find(|t| t.team_id == team_id)
        else {
            return "not in debate".to_string();
        };
        match (team.points, self.teams.len()) {
            (None, _) => "no result".to_string(),
            (Some(points), 2) if points > 0 => "won".to_string(),
            (Some(_), 2) => "lost".to_string(),
            (Some(points), _) => format!("{points} points"),
        }
    }
}

/// All debates of a tournament, in round order.
pub struct TournamentDebates {
    pub debates: IndexMap<String, DebateInfo>,
}

impl TournamentDebates {
    #[tracing::instrument(skip(conn))]
    pub fn load(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Self> {
        let rows = tournament_debates::table
            .inner_join(tournament_rounds::table)
            .filter(tournament_debates::tournament_id.eq(tid))
            .order_by((
                tournament_rounds::seq.asc(),
                tournament_debates::number.asc(),
            ))
            .select((
                tournament_debates::all_columns,
                tournament_rounds::all_columns,
            ))
            .load::<(Debate, Round)>(conn)?;

        let mut teams: HashMap<String, Vec<DebateTeam>> = HashMap::new();
        for team in tournament_debate_teams::table
            .inner_join(tournament_debates::table)
            .filter(tournament_debates::tournament_id.eq(tid))
            .order_by(tournament_debate_teams::side.asc())
            .select(tournament_debate_teams::all_columns)
            .load::<DebateTeam>(conn)?
        {
            teams.entry(team.debate_id.clone()).or_default().push(team);
        }

        let mut adjs: HashMap<String, Vec<DebateAdjudicator>> = HashMap::new();
        for adj in tournament_debate_adjudicators::table
            .inner_join(tournament_debates::table)
            .filter(tournament_debates::tournament_id.eq(tid))
            .select(tournament_debate_adjudicators::all_columns)
            .load::<DebateAdjudicator>(conn)?
        {
            adjs.entry(adj.debate_id.clone()).or_default().push(adj);
        }

        let debates = rows
            .into_iter()
            .map(|(debate, round)| {
                let id = debate.id.clone();
                let info = DebateInfo {
                    teams: teams.remove(&id).unwrap_or_default(),
                    adjudicators: adjs.remove(&id).unwrap_or_default(),
                    debate,
                    round,
                };
                (id, info)
            })
            .collect();

        Ok(Self { debates })
    }

    pub fn get(&self, debate_id: &str) -> Option<&DebateInfo> {
        self.debates.get(debate_id)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &DebateInfo> {
        self.debates.values()
    }

    /// Debates in rounds up to and including the round with the given
    /// sequence number.
    pub fn up_to(&self, seq: i64) -> impl Iterator<Item = &DebateInfo> {
        self.iter().filter(move |info| info.round.seq <= seq)
    }

    /// Debates in which the given adjudicator was allocated.
    pub fn of_adjudicator<'a>(
        &'a self,
        adj_id: &'a str,
    ) -> impl Iterator<Item = &'a DebateInfo> {
        self.iter()
            .filter(move |info| info.role_of(adj_id).is_some())
    }

    /// Debates in which the given team took part.
    pub fn of_team<'a>(
        &'a self,
        team_id: &'a str,
    ) -> impl Iterator<Item = &'a DebateInfo> {
        self.iter().filter(move |info| info.has_team(team_id))
    }
}
