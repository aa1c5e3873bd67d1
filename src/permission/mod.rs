//! Checks on what a user may do within a tournament.
//!
//! Every member of a tournament may view the tabroom pages. Only superusers
//! may change adjudicator scores, generate private URLs or edit the
//! tournament's preferences.

use diesel::{
    connection::LoadConnection, dsl::exists, prelude::*, select,
    sqlite::Sqlite,
};

use crate::{
    schema::tournament_members, tournaments::Tournament,
    util_resp::FailureResponse,
};

impl Tournament {
    pub fn check_user_is_superuser(
        &self,
        user_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<(), FailureResponse> {
        let has_permission = select(exists(
            tournament_members::table.filter(
                tournament_members::user_id
                    .eq(user_id)
                    .and(tournament_members::tournament_id.eq(&self.id))
                    .and(tournament_members::is_superuser.eq(true)),
            ),
        ))
        .get_result::<bool>(conn)?;

        if has_permission {
            Ok(())
        } else {
            tracing::debug!(user_id, tournament = %self.id, "not a superuser");
            Err(FailureResponse::Unauthorized(()))
        }
    }

    pub fn check_user_is_member(
        &self,
        user_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<(), FailureResponse> {
        let is_member = select(exists(
            tournament_members::table.filter(
                tournament_members::user_id
                    .eq(user_id)
                    .and(tournament_members::tournament_id.eq(&self.id)),
            ),
        ))
        .get_result::<bool>(conn)?;

        if is_member {
            Ok(())
        } else {
            tracing::debug!(user_id, tournament = %self.id, "not a member");
            Err(FailureResponse::Unauthorized(()))
        }
    }
}
