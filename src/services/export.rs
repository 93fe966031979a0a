use crate::{error::ServiceError, services::session_service, state::SharedState};

/// Header row of the history export, matching the on-screen table.
const HISTORY_HEADER: [&str; 4] = ["Partida", "Ganador", "Perdedor", "Marcador"];

/// Render a room's match history as CSV, newest match first.
pub async fn history_csv(state: &SharedState, room: &str) -> Result<Vec<u8>, ServiceError> {
    let view = session_service::current_view(state, room).await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HISTORY_HEADER).map_err(csv_error)?;
    for record in &view.history {
        writer
            .write_record([
                format!("#{}", record.sequence_number),
                record.winner.clone(),
                record.loser.clone(),
                record.score.clone(),
            ])
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|err| ServiceError::Internal(err.to_string()))
}

fn csv_error(err: csv::Error) -> ServiceError {
    ServiceError::Internal(err.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::dao::session_store::memory::InMemorySessionStore;
    use crate::dto::session::{
        ConfigurePayload, HandPayload, RegisterTeamsPayload, SelectModePayload,
    };
    use crate::state::AppState;
    use crate::state::session::GameMode;

    async fn duel_state(room: &str) -> SharedState {
        let state = AppState::new();
        state
            .install_session_store(Arc::new(InMemorySessionStore::new()))
            .await;
        session_service::enter_room(&state, room).await.unwrap();
        session_service::select_mode(
            &state,
            room,
            SelectModePayload {
                mode: GameMode::FixedDuel,
            },
        )
        .await
        .unwrap();
        session_service::configure(
            &state,
            room,
            ConfigurePayload {
                roster_size: 2,
                threshold: 50,
            },
        )
        .await
        .unwrap();
        session_service::register_teams(
            &state,
            room,
            RegisterTeamsPayload {
                teams: vec!["Los Primos".to_string(), "Azules".to_string()],
            },
        )
        .await
        .unwrap();
        state
    }

    async fn win_hand(state: &SharedState, room: &str, winner: &str) {
        session_service::record_hand(
            state,
            room,
            HandPayload {
                winner: winner.to_string(),
                points: 60,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn exports_history_newest_first() {
        let state = duel_state("Mesa").await;
        win_hand(&state, "Mesa", "Los Primos").await;
        win_hand(&state, "Mesa", "Azules").await;

        let bytes = history_csv(&state, "Mesa").await.unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Partida,Ganador,Perdedor,Marcador");
        assert_eq!(lines[1], "#2,Azules,Los Primos,60 a 0");
        assert_eq!(lines[2], "#1,Los Primos,Azules,60 a 0");
        assert_eq!(lines.len(), 3);
    }

    #[tokio::test]
    async fn exports_only_the_header_before_any_match() {
        let state = duel_state("Mesa").await;

        let bytes = history_csv(&state, "Mesa").await.unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(text.trim_end(), "Partida,Ganador,Perdedor,Marcador");
    }

    #[tokio::test]
    async fn export_requires_a_live_room() {
        let state = AppState::new();
        state
            .install_session_store(Arc::new(InMemorySessionStore::new()))
            .await;

        let result = history_csv(&state, "Fantasma").await;
        assert!(matches!(result, Err(crate::error::ServiceError::NotFound(_))));
    }
}
