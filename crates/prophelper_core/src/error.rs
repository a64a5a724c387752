use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProposalError {
    #[error("unterminated template near `{excerpt}`")]
    UnterminatedTemplate { excerpt: String },

    #[error("no property proposal sections found in document")]
    NoProposalSections,
}
