use std::collections::TryReserveError;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "Out of memory while growing {}.", _0)]
    OutOfMemory(&'static str),
    #[fail(display = "Key {} is out of range, the sparse index holds {} keys.", key, limit)]
    KeyOutOfRange { key: u32, limit: u64 },
    #[fail(display = "Registry is full, it holds at most {} entries.", _0)]
    RegistryFull(usize),
    #[fail(display = "{} is invalid.", _0)]
    InvalidHandle(String),
    #[fail(display = "Name '{}' has already been registered.", _0)]
    DuplicateName(String),
    #[fail(display = "Invalid property: {}.", _0)]
    InvalidProperty(String),
    #[fail(display = "Entity id {} must be greater than the last id {}.", id, last)]
    EntityIdNotMonotonic { id: u32, last: u32 },
    #[fail(display = "Entity {} does not exist.", _0)]
    EntityNotFound(u32),
    #[fail(display = "Entity {} can not be parented to its descendant {}.", entity, parent)]
    CyclicParent { entity: u32, parent: u32 },
    #[fail(display = "Type mismatch: {}.", _0)]
    ComponentTypeMismatch(String),
    #[fail(display = "Registry '{}' does not hold assets of type {}.", name, expected)]
    AssetTypeMismatch { name: String, expected: &'static str },
    #[fail(display = "Registry '{}' has no loader for this operation.", _0)]
    NoLoader(String),
    #[fail(display = "Failed to load '{}': {}", name, cause)]
    LoadFailed { name: String, cause: failure::Error },
    #[fail(display = "'{}' is already in use by an outer operation.", _0)]
    Reentrant(String),
    #[fail(display = "Malformed settings: {}", _0)]
    Malformed(String),
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl Error {
    pub(crate) fn oom(what: &'static str) -> impl FnOnce(TryReserveError) -> Error {
        move |_| Error::OutOfMemory(what)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Malformed(format!("{}", err))
    }
}
