use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpawnError {
    #[error("no safe spawn point found after {attempts} attempts")]
    NoSafeSpawnPoint { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
    #[error("transport failure: {0}")]
    Io(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdmitError {
    #[error("game is full ({capacity} players)")]
    GameFull { capacity: usize },
}
