//! Secondary indexes over base relations.

pub mod btree;
