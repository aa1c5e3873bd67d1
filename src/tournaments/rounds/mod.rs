use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::schema::tournament_rounds;

#[derive(Serialize, Deserialize, Queryable, Clone, Debug, PartialEq)]
pub struct Round {
    pub id: String,
    pub tournament_id: String,
    pub seq: i64,
    pub name: String,
    pub abbreviation: String,
    pub completed: bool,
    pub draw_released: bool,
}

impl Round {
    pub fn all(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Vec<Round>> {
        tournament_rounds::table
            .filter(tournament_rounds::tournament_id.eq(tid))
            .order_by(tournament_rounds::seq.asc())
            .load::<Round>(conn)
    }

    /// The round the tournament is currently on: the first round which has
    /// not been completed, or the last round once every round is complete.
    /// `None` if the tournament has no rounds.
    pub fn current(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Option<Round>> {
        let first_incomplete = tournament_rounds::table
            .filter(tournament_rounds::tournament_id.eq(tid))
            .filter(tournament_rounds::completed.eq(false))
            .order_by(tournament_rounds::seq.asc())
            .first::<Round>(conn)
            .optional()?;

        match first_incomplete {
            Some(round) => Ok(Some(round)),
            None => tournament_rounds::table
                .filter(tournament_rounds::tournament_id.eq(tid))
                .order_by(tournament_rounds::seq.desc())
                .first::<Round>(conn)
                .optional(),
        }
    }
}
