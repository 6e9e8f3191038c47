use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    #[error(transparent)]
    Channel(#[from] courier_channels::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for courier_channels::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Channel(inner) => inner,
            Error::Telegram(e) => Self::external("telegram request failed", e),
        }
    }
}
