//! Recursion guard for the approval walk.

use shared_types::Address;

use super::errors::ApprovalError;

/// The Safes on the current approval chain, root first.
#[derive(Debug, Clone)]
pub struct ApprovalPath {
    stack: Vec<Address>,
    max_depth: usize,
}

impl ApprovalPath {
    pub fn new(max_depth: usize) -> Self {
        Self {
            stack: Vec::new(),
            max_depth,
        }
    }

    /// Push `safe`, failing if it is already on the chain.
    pub fn enter(&mut self, safe: Address) -> Result<(), ApprovalError> {
        if self.contains(&safe) {
            let mut path = self.stack.clone();
            path.push(safe);
            return Err(ApprovalError::OwnershipCycle { path });
        }
        if self.depth() >= self.max_depth {
            let mut path = self.stack.clone();
            path.push(safe);
            return Err(ApprovalError::TooDeep {
                max: self.max_depth,
                path,
            });
        }
        self.stack.push(safe);
        Ok(())
    }

    pub fn leave(&mut self) {
        self.stack.pop();
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }

    fn contains(&self, safe: &Address) -> bool {
        self.stack.contains(safe)
    }
}
