pub(crate) mod connections;
pub(crate) mod limits;
pub(crate) mod lookup;
pub(crate) mod meta;
pub(crate) mod run;
pub(crate) mod shared;
