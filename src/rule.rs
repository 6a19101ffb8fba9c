//! The contract every formatting rule implements.

use crate::context::PassContext;
use crate::error::{Result, TreeError};
use crate::tree::{NodeId, SyntaxTree};

/// A structural rewrite rule.
///
/// For every pass the formatter calls [`before_visit`](Rule::before_visit),
/// then [`visit`](Rule::visit) once per node in pre-order, then
/// [`after_visit`](Rule::after_visit). `visit` only sees the context
/// immutably: edits are collected as [`PendingAction`]s and applied in
/// `after_visit`, once the walk is over.
pub trait Rule {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn before_visit(&mut self, _ctx: &mut PassContext<'_>) {}

    fn visit(&mut self, _ctx: &PassContext<'_>, _node: NodeId) {}

    fn after_visit(&mut self, _ctx: &mut PassContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// A deferred tree edit together with the correction it reports.
pub trait PendingAction {
    /// Message for the diagnostics sink and the node it is reported against.
    fn describe(&self, tree: &SyntaxTree) -> (String, NodeId);

    fn apply(&self, ctx: &mut PassContext<'_>) -> Result<(), TreeError>;

    fn report(&self, ctx: &mut PassContext<'_>) {
        let (message, node) = self.describe(ctx.tree());
        ctx.report(&message, node);
    }
}
