//! Per-role assistant presentation: name, greeting, quick actions.

use campus_core::Role;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuickAction {
    pub id: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Portal {
    pub role: Role,
    pub name: &'static str,
    pub greeting: &'static str,
    pub quick_actions: &'static [QuickAction],
}

const STUDENT: Portal = Portal {
    role: Role::Student,
    name: "Student Assistant",
    greeting: "Hi! I'm your Student Assistant. I can help you with academics, fees, \
               attendance, library services, and more. What would you like to know?",
    quick_actions: &[
        QuickAction { id: "attendance", label: "My Attendance" },
        QuickAction { id: "fees", label: "Fee Status" },
        QuickAction { id: "results", label: "Exam Results" },
        QuickAction { id: "library", label: "Library Books" },
    ],
};

const FACULTY: Portal = Portal {
    role: Role::Faculty,
    name: "Faculty Assistant",
    greeting: "Hello! I'm your Faculty Assistant. I can help you with class schedules, \
               student management, grade entry, and administrative tasks. How may I assist you?",
    quick_actions: &[
        QuickAction { id: "schedule", label: "My Schedule" },
        QuickAction { id: "students", label: "My Students" },
        QuickAction { id: "attendance", label: "Mark Attendance" },
        QuickAction { id: "grades", label: "Grade Entry" },
    ],
};

const ADMIN: Portal = Portal {
    role: Role::Admin,
    name: "Admin Assistant",
    greeting: "Welcome! I'm your Admin Assistant. I can help you with student management, \
               faculty oversight, system analytics, and administrative operations. \
               What do you need help with?",
    quick_actions: &[
        QuickAction { id: "analytics", label: "System Analytics" },
        QuickAction { id: "students", label: "Student Management" },
        QuickAction { id: "faculty", label: "Faculty Management" },
        QuickAction { id: "reports", label: "Generate Reports" },
    ],
};

impl Portal {
    #[must_use]
    pub const fn for_role(role: Role) -> &'static Self {
        match role {
            Role::Student => &STUDENT,
            Role::Faculty => &FACULTY,
            Role::Admin => &ADMIN,
        }
    }

    #[must_use]
    pub fn quick_action_labels(&self) -> Vec<String> {
        self.quick_actions
            .iter()
            .map(|action| action.label.to_string())
            .collect()
    }

    /// Follow-up suggestions for a backend reply, keyed on what it talks about.
    #[must_use]
    pub fn suggestions_for_response(&self, response: &str) -> Vec<String> {
        let text = response.to_lowercase();
        let topical: Option<&[&str]> = if text.contains("library") {
            Some(&["Library timings", "Book catalog", "Renew books"][..])
        } else if text.contains("fee") || text.contains("payment") {
            Some(&["Pay fees", "Fee structure", "Payment history"][..])
        } else if text.contains("exam") || text.contains("result") {
            Some(&["Exam schedule", "Results", "Grade report"][..])
        } else if text.contains("admission") {
            Some(&["Admission process", "Documents required", "Admission status"][..])
        } else {
            None
        };

        match topical {
            Some(labels) => labels.iter().map(|s| (*s).to_string()).collect(),
            None => self.quick_action_labels().into_iter().take(3).collect(),
        }
    }
}
