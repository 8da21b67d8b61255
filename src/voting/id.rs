use std::fmt::{self, Display, Formatter};

use serde::{Serialize, Deserialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub Uuid);
impl Id {
    pub fn new() -> Id {
        Id(Uuid::new_v4())
    }
}
impl Display for Id {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl From<Uuid> for Id {
    fn from(value: Uuid) -> Self {
        Id(value)
    }
}
impl PartialEq<Uuid> for Id {
    fn eq(&self, other: &Uuid) -> bool {
        self.0 == *other
    }
}
