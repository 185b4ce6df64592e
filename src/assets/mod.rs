pub(crate) mod decode;
pub(crate) mod pool;
pub(crate) mod source;
