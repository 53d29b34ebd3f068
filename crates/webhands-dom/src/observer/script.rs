//! In-page hooks for the mutation observer bridge.

/// Installs a `MutationObserver` on the document that buffers serialized
/// records in `window.__webhandsMutations`. Re-installing is a no-op.
pub const INSTALL_OBSERVER_JS: &str = r#"function () {
    if (window.__webhandsObserver) {
        return true;
    }
    window.__webhandsMutations = [];
    const serialize = (node) => ({
        nodeName: node.nodeName,
        id: node.id || null,
        className: typeof node.className === 'string' ? node.className : null
    });
    const push = (event) => {
        (window.__webhandsMutations = window.__webhandsMutations || []).push(event);
    };
    const observer = new MutationObserver((records) => {
        for (const record of records) {
            if (record.type === 'childList') {
                record.addedNodes.forEach((node) => {
                    if (node.nodeType === 1) {
                        push({ type: 'added', target: serialize(node) });
                    }
                });
                record.removedNodes.forEach((node) => {
                    if (node.nodeType === 1) {
                        push({ type: 'removed', target: serialize(node) });
                    }
                });
            } else if (record.type === 'attributes') {
                push({
                    type: 'attribute',
                    target: serialize(record.target),
                    attributeName: record.attributeName,
                    oldValue: record.oldValue,
                    newValue: record.target.getAttribute(record.attributeName)
                });
            } else if (record.type === 'characterData') {
                push({
                    type: 'modified',
                    target: serialize(record.target.parentElement || record.target),
                    oldValue: record.oldValue,
                    newValue: record.target.data
                });
            }
        }
    });
    observer.observe(document.documentElement || document, {
        childList: true,
        subtree: true,
        attributes: true,
        attributeOldValue: true,
        characterData: true,
        characterDataOldValue: true
    });
    window.__webhandsObserver = observer;
    return true;
}"#;

/// Returns and clears the buffered records, or null when the hook is not
/// installed in the current document.
pub const DRAIN_MUTATIONS_JS: &str = r#"function () {
    if (!window.__webhandsObserver) {
        return null;
    }
    const batch = window.__webhandsMutations || [];
    window.__webhandsMutations = [];
    return batch;
}"#;

pub const DISCONNECT_OBSERVER_JS: &str = r#"function () {
    if (window.__webhandsObserver) {
        window.__webhandsObserver.disconnect();
        delete window.__webhandsObserver;
    }
    window.__webhandsMutations = [];
    return true;
}"#;

/// Current value of attribute `args[0]` on `this`, or null.
pub const GET_ATTRIBUTE_JS: &str = r#"function (name) {
    return this.getAttribute(name);
}"#;
