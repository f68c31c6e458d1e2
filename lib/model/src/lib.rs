//! The data model of rdf-junction: RDF terms and the [Binding] solution mapping that
//! flows through every join operator.

mod binding;

pub use binding::Binding;

// Re-export some oxrdf types.
pub use oxrdf::{
    BlankNode, BlankNodeRef, Literal, LiteralRef, NamedNode, NamedNodeRef, Term, TermRef,
    Variable, VariableNameParseError, VariableRef,
};
