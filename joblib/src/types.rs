/// Client identity used for fairness: the peer's host address.
pub type Owner = String;
/// A job's working directory, doubling as its client-visible handle.
pub type Location = String;
/// Shell command line run for every job.
pub type Command = String;
pub type OutputBlob = bytes::Bytes;
