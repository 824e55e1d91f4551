// ============================================================================
// PLANS & GALLERY — session-local, newest first
// ============================================================================

use time::OffsetDateTime;
use time::macros::format_description;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlanKind {
    Drawing,
    Text,
}

impl PlanKind {
    pub fn label(self) -> String {
        match self {
            PlanKind::Drawing => t!("plan.kind.drawing"),
            PlanKind::Text => t!("plan.kind.text"),
        }
    }
}

/// A plan as submitted by a form, before the gallery assigns identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPlan {
    pub kind: PlanKind,
    pub title: String,
    /// PNG data URI for drawings, free text for text plans.
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    pub id: Uuid,
    pub kind: PlanKind,
    pub title: String,
    pub content: String,
    pub created_at: OffsetDateTime,
}

impl Plan {
    /// `YYYY-MM-DD HH:MM` in the offset the plan was created with.
    pub fn created_label(&self) -> String {
        let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]");
        self.created_at.format(&fmt).unwrap_or_default()
    }

    pub fn is_drawing(&self) -> bool {
        self.kind == PlanKind::Drawing
    }
}

/// In-memory collection of saved plans.
#[derive(Default, Debug)]
pub struct Gallery {
    plans: Vec<Plan>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign id and timestamp, then prepend.  Returns the stored plan.
    pub fn add(&mut self, plan: NewPlan) -> &Plan {
        let created_at = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        self.insert(plan, created_at)
    }

    fn insert(&mut self, plan: NewPlan, created_at: OffsetDateTime) -> &Plan {
        let stored = Plan {
            id: Uuid::new_v4(),
            kind: plan.kind,
            title: plan.title,
            content: plan.content,
            created_at,
        };
        log_info!("Gallery: saved {:?} plan {} ({:?})", stored.kind, stored.id, stored.title);
        self.plans.insert(0, stored);
        &self.plans[0]
    }

    /// Plans, newest first.
    pub fn list(&self) -> &[Plan] {
        &self.plans
    }

    pub fn get(&self, id: Uuid) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn text_plan(title: &str) -> NewPlan {
        NewPlan { kind: PlanKind::Text, title: title.into(), content: "body".into() }
    }

    #[test]
    fn newest_plan_is_listed_first() {
        let mut gallery = Gallery::new();
        gallery.add(text_plan("first"));
        gallery.add(text_plan("second"));
        let titles: Vec<&str> = gallery.list().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["second", "first"]);
    }

    #[test]
    fn ids_are_unique_and_resolvable() {
        let mut gallery = Gallery::new();
        let a = gallery.add(text_plan("a")).id;
        let b = gallery.add(text_plan("b")).id;
        assert_ne!(a, b);
        assert_eq!(gallery.get(a).map(|p| p.title.as_str()), Some("a"));
        assert!(gallery.get(Uuid::nil()).is_none());
        assert_eq!(gallery.len(), 2);
    }

    #[test]
    fn created_label_formats_minutes() {
        let mut gallery = Gallery::new();
        let plan = gallery.insert(text_plan("x"), datetime!(2024-05-04 09:07:30 UTC));
        assert_eq!(plan.created_label(), "2024-05-04 09:07");
    }
}
