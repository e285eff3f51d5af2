//! Callback declarations and their normalisation into canonical chains.

use crate::error::DispatchError;

/// How an entity declares its callbacks for one hook point.
#[derive(Clone)]
pub enum CallbackDeclaration<H> {
    /// Nothing declared.
    Absent,
    /// A single handler.
    Single(H),
    /// An ordered list of handlers, run first to last.
    Many(Vec<H>),
}

impl<H> CallbackDeclaration<H> {
    pub fn single(handler: H) -> Self {
        CallbackDeclaration::Single(handler)
    }

    pub fn many(handlers: impl IntoIterator<Item = H>) -> Self {
        CallbackDeclaration::Many(handlers.into_iter().collect())
    }

    /// The canonical chain for this declaration.
    ///
    /// Returns a read-only view over the declaration's own storage: absent
    /// yields an empty slice, a single handler a one-element slice, and a
    /// list the list itself with order and duplicates preserved.
    pub fn normalize(&self) -> &[H] {
        match self {
            CallbackDeclaration::Absent => &[],
            CallbackDeclaration::Single(handler) => std::slice::from_ref(handler),
            CallbackDeclaration::Many(handlers) => handlers,
        }
    }

    pub fn len(&self) -> usize {
        self.normalize().len()
    }

    pub fn is_empty(&self) -> bool {
        self.normalize().is_empty()
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, CallbackDeclaration::Absent)
    }

    /// Reject declarations that exceed `max_len` handlers.
    pub(crate) fn check_len(&self, max_len: usize) -> Result<(), DispatchError> {
        if self.len() > max_len {
            return Err(DispatchError::declaration(format!(
                "{} handlers declared, at most {} allowed",
                self.len(),
                max_len
            )));
        }
        Ok(())
    }
}

impl<H> Default for CallbackDeclaration<H> {
    fn default() -> Self {
        CallbackDeclaration::Absent
    }
}

impl<H> From<Option<H>> for CallbackDeclaration<H> {
    fn from(handler: Option<H>) -> Self {
        match handler {
            Some(handler) => CallbackDeclaration::Single(handler),
            None => CallbackDeclaration::Absent,
        }
    }
}

impl<H> From<Vec<H>> for CallbackDeclaration<H> {
    fn from(handlers: Vec<H>) -> Self {
        CallbackDeclaration::Many(handlers)
    }
}

impl<H> std::fmt::Debug for CallbackDeclaration<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallbackDeclaration::Absent => f.write_str("Absent"),
            CallbackDeclaration::Single(_) => f.write_str("Single"),
            CallbackDeclaration::Many(handlers) => write!(f, "Many({})", handlers.len()),
        }
    }
}

/// Free-function form of [`CallbackDeclaration::normalize`].
pub fn normalize<H>(decl: &CallbackDeclaration<H>) -> &[H] {
    decl.normalize()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn absent_normalizes_to_empty() {
        let decl: CallbackDeclaration<Arc<str>> = CallbackDeclaration::Absent;
        assert!(normalize(&decl).is_empty());
        assert!(decl.is_absent());
    }

    #[test]
    fn single_normalizes_to_itself() {
        let h: Arc<str> = Arc::from("a");
        let decl = CallbackDeclaration::single(Arc::clone(&h));
        let chain = normalize(&decl);
        assert_eq!(chain.len(), 1);
        assert!(Arc::ptr_eq(&chain[0], &h));
    }

    #[test]
    fn list_keeps_order_and_duplicates() {
        let a: Arc<str> = Arc::from("a");
        let b: Arc<str> = Arc::from("b");
        let decl = CallbackDeclaration::many([a.clone(), b.clone(), a.clone()]);
        let chain = normalize(&decl);
        assert_eq!(chain.len(), 3);
        assert!(Arc::ptr_eq(&chain[0], &a));
        assert!(Arc::ptr_eq(&chain[1], &b));
        assert!(Arc::ptr_eq(&chain[2], &a));
    }

    #[test]
    fn list_view_aliases_declaration_storage() {
        let decl = CallbackDeclaration::Many(vec![1, 2, 3]);
        let CallbackDeclaration::Many(inner) = &decl else {
            unreachable!()
        };
        assert_eq!(normalize(&decl).as_ptr(), inner.as_ptr());
    }

    #[test]
    fn empty_list_is_not_absent_but_normalizes_empty() {
        let decl: CallbackDeclaration<u8> = Vec::new().into();
        assert!(!decl.is_absent());
        assert!(decl.is_empty());
    }

    #[test]
    fn option_conversion() {
        assert!(CallbackDeclaration::<u8>::from(None).is_absent());
        assert_eq!(CallbackDeclaration::from(Some(7u8)).normalize(), &[7]);
    }

    #[test]
    fn length_cap_is_enforced() {
        let decl = CallbackDeclaration::many(0..5u8);
        assert!(decl.check_len(5).is_ok());
        let err = decl.check_len(4).unwrap_err();
        assert!(matches!(err, DispatchError::Declaration { .. }));
    }
}
