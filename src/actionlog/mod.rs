//! An append-only record of what was done in the tabroom, by whom, and to
//! which object.

use std::{convert::Infallible, fmt, net::SocketAddr, str::FromStr};

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use chrono::{NaiveDateTime, Utc};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{
    action_log_entries, adjudicator_feedback, adjudicator_test_score_history,
    adjudicators, tournament_debates, tournament_rounds, tournament_teams,
    tournaments,
};

pub mod view;

macro_rules! action_log_types {
    ($($variant:ident => $code:literal, $label:literal;)*) => {
        /// The kinds of action which are recorded. The codes are what is
        /// persisted, and must not change.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum ActionLogType {
            $($variant,)*
        }

        impl ActionLogType {
            pub const ALL: &'static [ActionLogType] = &[
                $(ActionLogType::$variant,)*
            ];

            pub fn code(&self) -> &'static str {
                match self {
                    $(ActionLogType::$variant => $code,)*
                }
            }

            pub fn label(&self) -> &'static str {
                match self {
                    $(ActionLogType::$variant => $label,)*
                }
            }
        }

        impl FromStr for ActionLogType {
            type Err = UnknownActionType;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($code => Ok(ActionLogType::$variant),)*
                    other => Err(UnknownActionType(other.to_string())),
                }
            }
        }
    };
}

action_log_types! {
    BallotDiscard => "ba.disc", "Discarded ballot set";
    BallotCheckin => "ba.ckin", "Checked in ballot set";
    BallotCreate => "ba.crea", "Created ballot set";
    BallotEdit => "ba.edit", "Edited ballot set";
    BallotConfirm => "ba.conf", "Confirmed ballot set";
    BallotSubmit => "ba.subm", "Submitted ballot set from the public form";
    FeedbackSubmit => "fb.subm", "Submitted feedback from the public form";
    FeedbackSave => "fb.save", "Saved feedback";
    TestScoreEdit => "ts.edit", "Edited adjudicator test score";
    AdjudicatorNoteSet => "aj.note", "Set adjudicator note";
    AdjudicatorsSave => "aa.save", "Saved adjudicator allocation";
    AdjudicatorsAuto => "aa.auto", "Auto-allocated adjudicators";
    VenuesSave => "ve.save", "Saved a venue manual edit";
    VenuesAuto => "ve.auto", "Auto-allocated venues";
    VenueCategoriesEdit => "ve.ca.edit", "Edited venue categories";
    DrawCreate => "dr.crea", "Created draw";
    DrawConfirm => "dr.conf", "Confirmed draw";
    DrawRegenerate => "dr.rege", "Regenerated draw";
    DrawRelease => "dr.rele", "Released draw";
    DrawUnrelease => "dr.unre", "Unreleased draw";
    MatchupSave => "mu.save", "Saved a matchup manual edit";
    DivisionsSave => "dv.save", "Saved divisions";
    MotionEdit => "mo.edit", "Added/edited motion";
    MotionsRelease => "mo.rele", "Released motions";
    MotionsUnrelease => "mo.unre", "Unreleased motions";
    DebateImportanceEdit => "db.im.edit", "Edited debate importance";
    AdjudicatorBreakSet => "br.aj.set", "Changed adjudicator breaking status";
    BreakEligibilityEdit => "br.el.edit", "Edited break eligibility";
    BreakCategoriesEdit => "br.ca.edit", "Edited break categories";
    BreakGenerateAll => "br.gene", "Generated the team break for all categories";
    BreakUpdateAll => "br.upda", "Edited breaking team remarks and updated all team breaks";
    BreakUpdateOne => "br.upd1", "Edited breaking team remarks and updated this team break";
    BreakEditRemarks => "br.rm.edit", "Edited breaking team remarks";
    RoundStartTimeSet => "rd.st.set", "Set start time";
    RoundAdvance => "rd.adva", "Advanced the current round to";
    AvailTeamsSave => "av.tm.save", "Edited teams availability";
    AvailAdjudicatorsSave => "av.aj.save", "Edited adjudicators availability";
    AvailVenuesSave => "av.ve.save", "Edited venue availability";
    OptionsEdit => "op.edit", "Edited tournament options";
    SpeakerEligibilityEdit => "se.edit", "Edited speaker category eligibility";
    SpeakerCategoriesEdit => "se.ca.edit", "Edited speaker categories";
}

impl fmt::Display for ActionLogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown action log type code `{0}`")]
pub struct UnknownActionType(pub String);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Adjudicator,
    AdjudicatorFeedback,
    AdjudicatorTestScoreHistory,
    Team,
    Round,
    Debate,
    Tournament,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Adjudicator => "adjudicator",
            EntityKind::AdjudicatorFeedback => "adjudicator_feedback",
            EntityKind::AdjudicatorTestScoreHistory => {
                "adjudicator_test_score_history"
            }
            EntityKind::Team => "team",
            EntityKind::Round => "round",
            EntityKind::Debate => "debate",
            EntityKind::Tournament => "tournament",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "adjudicator" => EntityKind::Adjudicator,
            "adjudicator_feedback" => EntityKind::AdjudicatorFeedback,
            "adjudicator_test_score_history" => {
                EntityKind::AdjudicatorTestScoreHistory
            }
            "team" => EntityKind::Team,
            "round" => EntityKind::Round,
            "debate" => EntityKind::Debate,
            "tournament" => EntityKind::Tournament,
            _ => return None,
        })
    }
}

/// A reference to the object an action was performed on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// A human-readable description of the referenced object, or `None` if
    /// it no longer exists.
    pub fn describe(
        &self,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Option<String>> {
        match self.kind {
            EntityKind::Adjudicator => adjudicators::table
                .find(&self.id)
                .select(adjudicators::name)
                .first::<String>(conn)
                .optional(),
            EntityKind::AdjudicatorFeedback => adjudicator_feedback::table
                .inner_join(adjudicators::table)
                .filter(adjudicator_feedback::id.eq(&self.id))
                .select((adjudicators::name, adjudicator_feedback::version))
                .first::<(String, i64)>(conn)
                .optional()
                .map(|row| {
                    row.map(|(name, version)| {
                        format!("Feedback on {name} (version {version})")
                    })
                }),
            EntityKind::AdjudicatorTestScoreHistory => {
                adjudicator_test_score_history::table
                    .inner_join(adjudicators::table)
                    .filter(adjudicator_test_score_history::id.eq(&self.id))
                    .select((
                        adjudicators::name,
                        adjudicator_test_score_history::score,
                    ))
                    .first::<(String, f64)>(conn)
                    .optional()
                    .map(|row| {
                        row.map(|(name, score)| {
                            format!("{name}: test score {score}")
                        })
                    })
            }
            EntityKind::Team => tournament_teams::table
                .find(&self.id)
                .select(tournament_teams::name)
                .first::<String>(conn)
                .optional(),
            EntityKind::Round => tournament_rounds::table
                .find(&self.id)
                .select(tournament_rounds::name)
                .first::<String>(conn)
                .optional(),
            EntityKind::Debate => tournament_debates::table
                .inner_join(tournament_rounds::table)
                .filter(tournament_debates::id.eq(&self.id))
                .select((
                    tournament_rounds::abbreviation,
                    tournament_debates::number,
                ))
                .first::<(String, i64)>(conn)
                .optional()
                .map(|row| {
                    row.map(|(round, number)| {
                        format!("{round} debate {number}")
                    })
                }),
            EntityKind::Tournament => tournaments::table
                .find(&self.id)
                .select(tournaments::name)
                .first::<String>(conn)
                .optional(),
        }
    }
}

#[derive(Queryable, Clone, Debug)]
pub struct ActionLogEntry {
    pub id: String,
    pub type_: String,
    pub user_id: Option<String>,
    pub tournament_id: Option<String>,
    pub round_id: Option<String>,
    pub ip_address: Option<String>,
    pub entity_kind: Option<String>,
    pub entity_id: Option<String>,
    pub timestamp: NaiveDateTime,
}

impl ActionLogEntry {
    pub fn action_type(&self) -> Result<ActionLogType, UnknownActionType> {
        self.type_.parse()
    }

    pub fn entity(&self) -> Option<EntityRef> {
        match (&self.entity_kind, &self.entity_id) {
            (Some(kind), Some(id)) => {
                EntityKind::parse(kind).map(|kind| EntityRef::new(kind, id))
            }
            _ => None,
        }
    }
}

/// Builds a single action log entry.
///
/// ```ignore
/// LogAction::new(ActionLogType::TestScoreEdit)
///     .user(&user.id)
///     .tournament(&tournament.id)
///     .entity(EntityRef::new(EntityKind::AdjudicatorTestScoreHistory, &id))
///     .record(&mut *conn)?;
/// ```
#[derive(Clone, Debug)]
pub struct LogAction {
    action: ActionLogType,
    user_id: Option<String>,
    tournament_id: Option<String>,
    round_id: Option<String>,
    ip_address: Option<String>,
    entity: Option<EntityRef>,
}

impl LogAction {
    pub fn new(action: ActionLogType) -> Self {
        Self {
            action,
            user_id: None,
            tournament_id: None,
            round_id: None,
            ip_address: None,
            entity: None,
        }
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn user_opt(mut self, user_id: Option<impl Into<String>>) -> Self {
        self.user_id = user_id.map(Into::into);
        self
    }

    pub fn tournament(mut self, tournament_id: impl Into<String>) -> Self {
        self.tournament_id = Some(tournament_id.into());
        self
    }

    pub fn round(mut self, round_id: Option<impl Into<String>>) -> Self {
        self.round_id = round_id.map(Into::into);
        self
    }

    pub fn ip(mut self, ip: Option<impl Into<String>>) -> Self {
        self.ip_address = ip.map(Into::into);
        self
    }

    /// Sets the affected object. Only one object can be referenced; a later
    /// call replaces an earlier one.
    pub fn entity(mut self, entity: EntityRef) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Writes exactly one row to the log. This should be called on the same
    /// connection (and so in the same transaction) as the change it records.
    pub fn record(
        self,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<ActionLogEntry> {
        let entry = ActionLogEntry {
            id: Uuid::now_v7().to_string(),
            type_: self.action.code().to_string(),
            user_id: self.user_id,
            tournament_id: self.tournament_id,
            round_id: self.round_id,
            ip_address: self.ip_address,
            entity_kind: self
                .entity
                .as_ref()
                .map(|entity| entity.kind.as_str().to_string()),
            entity_id: self.entity.map(|entity| entity.id),
            timestamp: Utc::now().naive_utc(),
        };

        diesel::insert_into(action_log_entries::table)
            .values((
                action_log_entries::id.eq(&entry.id),
                action_log_entries::type_.eq(&entry.type_),
                action_log_entries::user_id.eq(&entry.user_id),
                action_log_entries::tournament_id.eq(&entry.tournament_id),
                action_log_entries::round_id.eq(&entry.round_id),
                action_log_entries::ip_address.eq(&entry.ip_address),
                action_log_entries::entity_kind.eq(&entry.entity_kind),
                action_log_entries::entity_id.eq(&entry.entity_id),
                action_log_entries::timestamp.eq(entry.timestamp),
            ))
            .execute(conn)?;

        tracing::debug!(
            action = %entry.type_,
            tournament = ?entry.tournament_id,
            "recorded action"
        );

        Ok(entry)
    }
}

/// Records an action given as its persisted code.
///
/// # Panics
///
/// If `code` is not one of the known action codes. Nothing is written in
/// that case.
pub fn record_code(
    code: &str,
    builder: impl FnOnce(LogAction) -> LogAction,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<ActionLogEntry> {
    let action = match code.parse::<ActionLogType>() {
        Ok(action) => action,
        Err(e) => panic!("{e}"),
    };
    builder(LogAction::new(action)).record(conn)
}

/// The address a request came from. Uses the first `X-Forwarded-For` entry
/// when the server is behind a proxy.
#[derive(Clone, Debug, Default)]
pub struct ClientIp(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        if forwarded.is_some() {
            return Ok(ClientIp(forwarded));
        }

        Ok(ClientIp(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn codes_are_unique_and_round_trip() {
        assert_eq!(ActionLogType::ALL.len(), 41);

        let codes: HashSet<_> =
            ActionLogType::ALL.iter().map(|t| t.code()).collect();
        assert_eq!(codes.len(), ActionLogType::ALL.len());

        for action in ActionLogType::ALL {
            assert!(action.code().len() <= 10);
            assert_eq!(action.code().parse::<ActionLogType>(), Ok(*action));
        }
    }

    #[test]
    fn known_labels() {
        assert_eq!(
            ActionLogType::TestScoreEdit.label(),
            "Edited adjudicator test score"
        );
        assert_eq!(ActionLogType::AdjudicatorBreakSet.code(), "br.aj.set");
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert_eq!(
            "xx.nope".parse::<ActionLogType>(),
            Err(UnknownActionType("xx.nope".to_string()))
        );
    }

    #[test]
    fn entity_kinds_round_trip() {
        for kind in [
            EntityKind::Adjudicator,
            EntityKind::AdjudicatorFeedback,
            EntityKind::AdjudicatorTestScoreHistory,
            EntityKind::Team,
            EntityKind::Round,
            EntityKind::Debate,
            EntityKind::Tournament,
        ] {
            assert_eq!(EntityKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EntityKind::parse("venue"), None);
    }
}
