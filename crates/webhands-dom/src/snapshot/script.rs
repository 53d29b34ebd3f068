//! In-page scripts used by the snapshot builder.

/// Serializes the subtree under `this` (or `document.body` when `this` is not
/// an element) into nested `{type: "element" | "text", ...}` records.
///
/// Elements that are interactive, visible and top-most are stored in
/// `window.__webhandsCandidates` and carry their position there as
/// `candidateId`, so overlays can be drawn for indices assigned afterwards.
/// Top-most detection is only possible inside the viewport; elements outside
/// the viewport but inside the expansion margin count as top-most.
pub const BUILD_DOM_TREE_JS: &str = r#"function (opts) {
    const options = opts || {};
    const expansion = typeof options.viewportExpansion === 'number' ? options.viewportExpansion : 0;
    const includeShadow = !!options.includeShadowRoots;
    const root = (this && this.nodeType === 1) ? this : document.body;
    if (!root) {
        return null;
    }
    const candidates = [];
    window.__webhandsCandidates = candidates;

    const interactiveTags = new Set(['a', 'button', 'input', 'select', 'textarea', 'details', 'summary', 'option', 'label']);
    const interactiveRoles = new Set(['button', 'link', 'checkbox', 'radio', 'menuitem', 'menuitemcheckbox', 'menuitemradio', 'tab', 'option', 'switch', 'combobox', 'textbox', 'searchbox', 'slider', 'spinbutton', 'treeitem']);

    function viewOf(el) {
        return (el.ownerDocument && el.ownerDocument.defaultView) || window;
    }

    function xpathOf(el) {
        const segments = [];
        let current = el;
        while (current && current.nodeType === 1) {
            const parent = current.parentNode;
            const tag = current.tagName.toLowerCase();
            let position = 0;
            if (parent) {
                const same = Array.from(parent.children).filter(c => c.tagName === current.tagName);
                if (same.length > 1) {
                    position = same.indexOf(current) + 1;
                }
            }
            segments.unshift(position ? tag + '[' + position + ']' : tag);
            if (!parent || parent.nodeType !== 1) {
                break;
            }
            current = parent;
        }
        return '/' + segments.join('/');
    }

    function isVisible(el, style) {
        if (style.display === 'none' || style.visibility === 'hidden') {
            return false;
        }
        if (parseFloat(style.opacity) === 0) {
            return false;
        }
        const rect = el.getBoundingClientRect();
        return rect.width > 0 && rect.height > 0;
    }

    function isInteractiveCandidate(el, tag) {
        if (interactiveTags.has(tag)) {
            return true;
        }
        const role = el.getAttribute('role');
        if (role && interactiveRoles.has(role)) {
            return true;
        }
        if (el.hasAttribute('onclick') || el.isContentEditable) {
            return true;
        }
        const tabindex = el.getAttribute('tabindex');
        return tabindex !== null && parseInt(tabindex, 10) >= 0;
    }

    function isTopElement(el) {
        const view = viewOf(el);
        const rect = el.getBoundingClientRect();
        if (expansion !== -1) {
            const inExpanded = rect.bottom >= -expansion
                && rect.top <= view.innerHeight + expansion
                && rect.right >= -expansion
                && rect.left <= view.innerWidth + expansion;
            if (!inExpanded) {
                return false;
            }
        }
        const cx = rect.left + rect.width / 2;
        const cy = rect.top + rect.height / 2;
        if (cx < 0 || cy < 0 || cx > view.innerWidth || cy > view.innerHeight) {
            return true;
        }
        const scope = el.getRootNode();
        const probe = typeof scope.elementFromPoint === 'function' ? scope : el.ownerDocument;
        let hit = probe.elementFromPoint(cx, cy);
        while (hit) {
            if (hit === el) {
                return true;
            }
            hit = hit.parentElement;
        }
        return false;
    }

    function walk(el, shadowChild) {
        const tag = el.tagName.toLowerCase();
        const style = viewOf(el).getComputedStyle(el);
        const visible = isVisible(el, style);
        const disabled = !!el.disabled || el.getAttribute('aria-disabled') === 'true';
        const interactive = isInteractiveCandidate(el, tag) && !disabled && style.pointerEvents !== 'none';
        const top = visible && interactive ? isTopElement(el) : false;
        const attributes = {};
        for (const attr of Array.from(el.attributes)) {
            attributes[attr.name] = attr.value;
        }
        const node = {
            type: 'element',
            tagName: tag,
            xpath: xpathOf(el),
            attributes: attributes,
            isVisible: visible,
            isInteractive: interactive,
            isTopElement: top,
            isClickable: interactive && visible,
            isIframe: tag === 'iframe' || tag === 'frame',
            shadowRoot: !!el.shadowRoot,
            shadowChild: !!shadowChild,
            candidateId: null,
            children: []
        };
        if (interactive && visible && top) {
            node.candidateId = candidates.length;
            candidates.push(el);
        }

        if (node.isIframe) {
            try {
                const doc = el.contentDocument;
                if (doc && doc.documentElement) {
                    node.children.push(walk(doc.documentElement, false));
                }
            } catch (e) {
                // cross-origin: leaf
            }
            return node;
        }

        if (el.shadowRoot && includeShadow) {
            for (const child of Array.from(el.shadowRoot.children)) {
                node.children.push(walk(child, true));
            }
        }

        for (const child of Array.from(el.childNodes)) {
            if (child.nodeType === 1) {
                node.children.push(walk(child, false));
            } else if (child.nodeType === 3) {
                const text = child.textContent.trim();
                if (text) {
                    node.children.push({ type: 'text', text: text, isVisible: visible });
                }
            }
        }
        return node;
    }

    return walk(root, false);
}"#;

/// Draws `[index]` overlays over candidates. Takes `[[index, candidateId], ...]`.
pub const HIGHLIGHT_JS: &str = r#"function (targets) {
    const candidates = window.__webhandsCandidates || [];
    let container = document.getElementById('webhands-highlight-container');
    if (!container) {
        container = document.createElement('div');
        container.id = 'webhands-highlight-container';
        container.style.position = 'fixed';
        container.style.pointerEvents = 'none';
        container.style.top = '0';
        container.style.left = '0';
        container.style.width = '100%';
        container.style.height = '100%';
        container.style.zIndex = '2147483647';
        document.documentElement.appendChild(container);
    }
    const colors = ['#FF0000', '#00AA00', '#0000FF', '#FFA500', '#800080', '#008080', '#FF69B4', '#4B0082'];
    let drawn = 0;
    for (const pair of targets) {
        const index = pair[0];
        const el = candidates[pair[1]];
        if (!el) {
            continue;
        }
        let rect = el.getBoundingClientRect();
        const frame = el.ownerDocument.defaultView && el.ownerDocument.defaultView.frameElement;
        let offsetX = 0;
        let offsetY = 0;
        if (frame && el.ownerDocument !== document) {
            const frameRect = frame.getBoundingClientRect();
            offsetX = frameRect.left;
            offsetY = frameRect.top;
        }
        const color = colors[index % colors.length];
        const box = document.createElement('div');
        box.style.position = 'fixed';
        box.style.border = '2px solid ' + color;
        box.style.boxSizing = 'border-box';
        box.style.top = (rect.top + offsetY) + 'px';
        box.style.left = (rect.left + offsetX) + 'px';
        box.style.width = rect.width + 'px';
        box.style.height = rect.height + 'px';
        const label = document.createElement('div');
        label.textContent = String(index);
        label.style.position = 'absolute';
        label.style.top = '-2px';
        label.style.right = '-2px';
        label.style.background = color;
        label.style.color = 'white';
        label.style.fontSize = '11px';
        label.style.padding = '1px 4px';
        label.style.borderRadius = '3px';
        box.appendChild(label);
        container.appendChild(box);
        drawn += 1;
    }
    return drawn;
}"#;

pub const REMOVE_HIGHLIGHTS_JS: &str = r#"function () {
    const container = document.getElementById('webhands-highlight-container');
    if (container) {
        container.remove();
    }
    return true;
}"#;
