use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlmonerError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{kind} record was not found (id {id}).")]
    NotFound { kind: &'static str, id: i64 },

    #[error("Bank transaction {0} is already matched to another donation.")]
    AlreadyMatched(i64),

    #[error(
        "Amounts do not match ({donation_cents} vs {transaction_cents} cents). \
         Reconciliation requires exact value match."
    )]
    AmountMismatch {
        donation_cents: i64,
        transaction_cents: i64,
    },

    #[error(
        "Bank account mismatch between donation (account {donation_account}) \
         and bank transaction (account {transaction_account})."
    )]
    BankAccountMismatch {
        donation_account: i64,
        transaction_account: i64,
    },

    #[error("Unknown opportunity stage: {0}")]
    UnknownStage(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl AlmonerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AlmonerError>;
