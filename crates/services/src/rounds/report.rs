use quiz_core::model::{GameRecord, StatsSnapshot};
use quiz_core::time::format_record_date;

/// End-of-round text shown to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    title: String,
    message: String,
    button_text: String,
}

impl RoundReport {
    #[must_use]
    pub fn new(record: &GameRecord, stats: Option<&StatsSnapshot>) -> Self {
        let mut lines = vec![format!(
            "Your result: {}/{}",
            record.correct(),
            record.total()
        )];

        match stats {
            Some(stats) => {
                lines.push(format!("Quizzes played: {}", stats.games_played));
                match &stats.best_game {
                    Some(best) => lines.push(format!(
                        "Record: {}/{} ({})",
                        best.correct(),
                        best.total(),
                        format_record_date(best.date())
                    )),
                    None => lines.push("Record: -".to_owned()),
                }
                lines.push(format!("Average accuracy: {}%", stats.total_accuracy));
            }
            None => lines.push("Statistics are unavailable right now.".to_owned()),
        }

        Self {
            title: "This round is over!".to_owned(),
            message: lines.join("\n"),
            button_text: "Play again".to_owned(),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn button_text(&self) -> &str {
        &self.button_text
    }
}
