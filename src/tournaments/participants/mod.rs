use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    schema::{adjudicators, institutions, tournament_teams},
    tournaments::{Tournament, feedback::aggregate::adjudicator_pool_query},
    util_resp::FailureResponse,
};

#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug)]
#[diesel(check_for_backend(Sqlite))]
#[diesel(table_name = tournament_teams)]
pub struct Team {
    pub id: String,
    pub tournament_id: String,
    pub name: String,
    pub institution_id: Option<String>,
    pub url_key: Option<String>,
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug)]
#[diesel(check_for_backend(Sqlite))]
#[diesel(table_name = adjudicators)]
pub struct Adjudicator {
    pub id: String,
    /// `None` for adjudicators in the shared pool.
    pub tournament_id: Option<String>,
    pub name: String,
    pub institution_id: Option<String>,
    pub test_score: f64,
    pub breaking: bool,
    pub novice: bool,
    pub independent: bool,
    pub notes: Option<String>,
    pub url_key: Option<String>,
}

#[derive(Queryable, Serialize, Deserialize, Clone, Debug)]
pub struct Institution {
    pub id: String,
    pub tournament_id: Option<String>,
    pub name: String,
    pub code: String,
}

/// The owner of a private URL.
pub enum Participant {
    Team(Team),
    Adjudicator(Adjudicator),
}

impl Participant {
    pub fn of_url_key(
        tournament: &Tournament,
        url_key: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Self, FailureResponse> {
        let team = tournament_teams::table
            .filter(
                tournament_teams::tournament_id
                    .eq(&tournament.id)
                    .and(tournament_teams::url_key.eq(url_key)),
            )
            .select(Team::as_select())
            .first::<Team>(conn)
            .optional()?;

        if let Some(team) = team {
            return Ok(Self::Team(team));
        }

        let adjudicator = adjudicator_pool_query(tournament)
            .filter(adjudicators::url_key.eq(url_key.to_string()))
            .first::<Adjudicator>(conn)
            .optional()?;

        match adjudicator {
            Some(adjudicator) => Ok(Self::Adjudicator(adjudicator)),
            None => Err(FailureResponse::NotFound(())),
        }
    }
}

/// The teams and adjudicators which can take part in a tournament.
pub struct TournamentParticipants {
    pub teams: IndexMap<String, Team>,
    /// Includes the shared pool if the tournament uses shared adjudicators.
    pub adjudicators: IndexMap<String, Adjudicator>,
    pub institutions: IndexMap<String, Institution>,
}

impl TournamentParticipants {
    pub fn load(
        tournament: &Tournament,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<TournamentParticipants> {
        let teams = tournament_teams::table
            .filter(tournament_teams::tournament_id.eq(&tournament.id))
            .order_by(tournament_teams::name.asc())
            .select(Team::as_select())
            .load::<Team>(conn)?
            .into_iter()
            .map(|team| (team.id.clone(), team))
            .collect();

        let adjudicators = adjudicator_pool_query(tournament)
            .order_by(adjudicators::name.asc())
            .load::<Adjudicator>(conn)?
            .into_iter()
            .map(|adj| (adj.id.clone(), adj))
            .collect();

        let institutions = institutions::table
            .filter(
                institutions::tournament_id
                    .eq(&tournament.id)
                    .or(institutions::tournament_id.is_null()),
            )
            .load::<Institution>(conn)?
            .into_iter()
            .map(|institution| (institution.id.clone(), institution))
            .collect();

        Ok(Self {
            teams,
            adjudicators,
            institutions,
        })
    }

    pub fn institution_code(&self, institution_id: Option<&str>) -> &str {
        institution_id
            .and_then(|id| self.institutions.get(id))
            .map(|institution| institution.code.as_str())
            .unwrap_or("")
    }

    pub fn team_name(&self, team_id: &str) -> &str {
        self.teams
            .get(team_id)
            .map(|team| team.name.as_str())
            .unwrap_or("<unknown team>")
    }

    pub fn adjudicator_name(&self, adj_id: &str) -> &str {
        self.adjudicators
            .get(adj_id)
            .map(|adj| adj.name.as_str())
            .unwrap_or("<unknown adjudicator>")
    }
}
