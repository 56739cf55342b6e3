use std::collections::BTreeMap;
use std::sync::Arc;

use super::UploadedFile;

/// Uploaded files of a request keyed by form field name.
pub type UploadedFiles = BTreeMap<String, UploadNode>;

/// One level of the uploaded-file tree, mirroring nested multipart field names
/// such as `avatar`, `photos[]` or `profile[images][main]`.
#[derive(Debug, Clone)]
pub enum UploadNode {
    File(Arc<UploadedFile>),
    List(Vec<UploadNode>),
    Map(BTreeMap<String, UploadNode>),
}

impl UploadNode {
    pub fn as_file(&self) -> Option<&Arc<UploadedFile>> {
        match self {
            UploadNode::File(file) => Some(file),
            UploadNode::List(_) | UploadNode::Map(_) => None,
        }
    }

    /// Looks up a child by field name (maps) or decimal index (lists).
    pub fn get(&self, key: &str) -> Option<&UploadNode> {
        match self {
            UploadNode::File(_) => None,
            UploadNode::List(nodes) => key.parse::<usize>().ok().and_then(|index| nodes.get(index)),
            UploadNode::Map(nodes) => nodes.get(key),
        }
    }

    /// All files below this node, depth first.
    pub fn files(&self) -> Vec<&Arc<UploadedFile>> {
        let mut files = Vec::new();
        self.collect_files(&mut files);
        files
    }

    fn collect_files<'a>(&'a self, files: &mut Vec<&'a Arc<UploadedFile>>) {
        match self {
            UploadNode::File(file) => files.push(file),
            UploadNode::List(nodes) => nodes.iter().for_each(|node| node.collect_files(files)),
            UploadNode::Map(nodes) => nodes.values().for_each(|node| node.collect_files(files)),
        }
    }
}

impl From<UploadedFile> for UploadNode {
    fn from(file: UploadedFile) -> Self {
        UploadNode::File(Arc::new(file))
    }
}

impl From<Arc<UploadedFile>> for UploadNode {
    fn from(file: Arc<UploadedFile>) -> Self {
        UploadNode::File(file)
    }
}

impl From<Vec<UploadNode>> for UploadNode {
    fn from(nodes: Vec<UploadNode>) -> Self {
        UploadNode::List(nodes)
    }
}

impl From<BTreeMap<String, UploadNode>> for UploadNode {
    fn from(nodes: BTreeMap<String, UploadNode>) -> Self {
        UploadNode::Map(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ByteStream;

    fn file(content: &str) -> UploadNode {
        UploadedFile::new(ByteStream::from_content(content), None, 0).unwrap().into()
    }

    #[test]
    fn nested_lookup() {
        let images = BTreeMap::from([("main".to_string(), file("main")), ("thumbs".to_string(), vec![file("a"), file("b")].into())]);
        let profile = UploadNode::Map(images);

        assert!(profile.get("main").and_then(UploadNode::as_file).is_some());
        assert!(profile.get("thumbs").and_then(|thumbs| thumbs.get("1")).and_then(UploadNode::as_file).is_some());
        assert!(profile.get("thumbs").and_then(|thumbs| thumbs.get("2")).is_none());
        assert!(profile.get("missing").is_none());
        assert!(profile.as_file().is_none());
    }

    #[test]
    fn files_are_collected_depth_first() {
        let tree = UploadNode::List(vec![file("a"), UploadNode::List(vec![file("b"), file("c")]), file("d")]);

        let contents = tree.files().iter().map(|file| file.stream().unwrap().to_string()).collect::<Vec<_>>();
        assert_eq!(contents, ["a", "b", "c", "d"]);
    }
}
