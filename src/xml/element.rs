//! In-memory XML fragment tree.
//!
//! A metadata payload is built once by a family builder (or read from a
//! fragment file) and then handed to the store unchanged.

/// An attribute, optionally in a namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Namespace URI (`None` for plain attributes)
    pub namespace: Option<String>,

    /// Local name
    pub name: String,

    /// Raw (unescaped) value
    pub value: String,
}

/// An XML element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Namespace URI (`None` for elements in no namespace)
    pub namespace: Option<String>,

    /// Local name
    pub name: String,

    /// Attributes in construction order
    pub attributes: Vec<Attribute>,

    /// Child elements in document order
    pub children: Vec<Element>,

    /// Character content, if any
    pub text: Option<String>,
}

impl Element {
    /// Create an element in a namespace
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Create an element in no namespace
    pub fn unqualified(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Create a namespaced element holding only text
    pub fn leaf(namespace: &str, name: &str, text: impl Into<String>) -> Self {
        Self::new(namespace, name).with_text(text)
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_ns_attr(
        mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.attributes.push(Attribute {
            namespace: Some(namespace.into()),
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Set a plain attribute, replacing an existing one of the same name
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|a| a.namespace.is_none() && a.name == name)
        {
            existing.value = value;
        } else {
            self.attributes.push(Attribute {
                namespace: None,
                name,
                value,
            });
        }
    }

    /// Value of a plain attribute
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// First child with the given local name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Descend through first children matching each local name in `path`
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |el, name| el.child(name))
    }

    /// Text of the descendant at `path`
    pub fn text_at(&self, path: &[&str]) -> Option<&str> {
        self.find(path).and_then(|el| el.text.as_deref())
    }
}
