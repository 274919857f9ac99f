//! Keyword routing for domain-specific fields.
//!
//! Paragraphs that mention contact details, a submission route or a study
//! type are lifted out of generic content into dedicated fields. Matching is a
//! case-insensitive substring test; the first rule that matches wins.

use super::normalize::IntermediateNode;
use crate::observe::{DropReason, PipelineEvent, PipelineObserver, RoutedField, Stage};
use crate::section::{Section, StudyType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Contact,
    Submission,
    StudyType,
}

/// Priority order matters: "contact" beats "submit" beats "study type".
const RULES: &[(&str, Route)] = &[
    ("contact", Route::Contact),
    ("submit", Route::Submission),
    ("study type", Route::StudyType),
];

const REQUIRED_DOCUMENTS: &str = "required document";

pub fn route_for(text: &str) -> Option<Route> {
    let lower = text.to_lowercase();
    RULES
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, route)| *route)
}

pub fn mentions_required_documents(items: &[String]) -> bool {
    items
        .iter()
        .any(|item| item.to_lowercase().contains(REQUIRED_DOCUMENTS))
}

/// Store `text` from `node` into the field selected by `route`.
pub fn apply(
    route: Route,
    target: &mut Section,
    text: &str,
    node: &IntermediateNode,
    obs: &mut dyn PipelineObserver,
) {
    let field = match route {
        Route::Contact => {
            // first contact paragraph wins
            if !target.contact_info.is_empty() {
                obs.on_event(&PipelineEvent::NodeDropped {
                    stage: Stage::Classify,
                    tag: node.tag.clone(),
                    reason: DropReason::ContactAlreadySet,
                });
                return;
            }
            target.contact_info = text.to_string();
            RoutedField::Contact
        }
        Route::Submission => {
            if target.submission_link.is_empty() {
                target.submission_link = node.nearest_href().unwrap_or_default().to_string();
            }
            RoutedField::Submission
        }
        Route::StudyType => {
            target.study_types.push(StudyType {
                kind: text.to_string(),
                description: String::new(),
            });
            RoutedField::StudyType
        }
    };
    obs.on_event(&PipelineEvent::FieldRouted { field });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order() {
        assert_eq!(route_for("Please CONTACT us"), Some(Route::Contact));
        assert_eq!(route_for("Contact us to submit"), Some(Route::Contact));
        assert_eq!(route_for("Submit your form"), Some(Route::Submission));
        assert_eq!(route_for("Resubmitted drafts are welcome"), Some(Route::Submission));
        // substring match: "submissions" does not contain "submit"
        assert_eq!(route_for("Submissions close Friday"), None);
        assert_eq!(route_for("Study Type: observational"), Some(Route::StudyType));
        assert_eq!(route_for("Nothing special here"), None);
    }

    #[test]
    fn required_documents_match() {
        assert!(mentions_required_documents(&["Required Documents: CV".into()]));
        assert!(!mentions_required_documents(&["CV".into(), "Cover letter".into()]));
    }

    #[test]
    fn contact_is_first_write_wins() {
        let node = IntermediateNode::new("p", "", vec![]);
        let mut s = Section::with_heading("About");
        apply(Route::Contact, &mut s, "contact a@b.c", &node, &mut ());
        apply(Route::Contact, &mut s, "contact x@y.z", &node, &mut ());
        assert_eq!(s.contact_info, "contact a@b.c");
    }

    #[test]
    fn submission_without_anchor_is_empty() {
        let node = IntermediateNode::new("p", "", vec![IntermediateNode::new("#text", "Submit by mail", vec![])]);
        let mut s = Section::default();
        apply(Route::Submission, &mut s, "Submit by mail", &node, &mut ());
        assert_eq!(s.submission_link, "");
        assert!(s.content.is_empty());
    }

    #[test]
    fn submission_takes_nearest_anchor() {
        let mut near = IntermediateNode::new("a", "", vec![IntermediateNode::new("#text", "here", vec![])]);
        near.href = Some("/near".into());
        let mut far = IntermediateNode::new("a", "", vec![IntermediateNode::new("#text", "there", vec![])]);
        far.href = Some("/far".into());
        let node = IntermediateNode::new("p", "", vec![IntermediateNode::new("em", "", vec![far]), near]);

        let mut s = Section::default();
        apply(Route::Submission, &mut s, "Submit here", &node, &mut ());
        assert_eq!(s.submission_link, "/near");
    }
}
