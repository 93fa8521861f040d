//! Datos y analizadores de prueba compartidos por los tests de varios módulos.

use std::sync::Arc;

use crate::analyzer::{ComplaintAnalyzer, InferenceContext, ModelState, DEFAULT_MAX_COMPLAINT_CHARS};
use crate::sentiment::SentimentScorer;
use crate::training::{fit_context, TrainingRow};

const ROWS: &[(&str, &str, &str, &str, &str)] = &[
    ("The wifi keeps disconnecting in the hostel", "Facilities", "High", "Technical", "IT Department"),
    ("Library wifi is extremely slow and keeps dropping", "Facilities", "Medium", "Technical", "IT Department"),
    ("Internet connection in the library is down", "Facilities", "High", "Technical", "IT Department"),
    ("Wifi router on the second floor is not working", "Facilities", "Medium", "Technical", "IT Department"),
    ("Cannot log in to the student portal", "Administrative", "High", "Technical", "IT Department"),
    ("Lab computers crash when running software", "Academic", "Medium", "Technical", "IT Department"),
    ("Projector in lecture hall is broken", "Academic", "Medium", "Technical", "IT Department"),
    ("Email account password reset is not working", "Administrative", "Low", "Technical", "IT Department"),
    ("Hostel bathroom is dirty and smelly", "Hostel", "Medium", "Non-Technical", "Facilities Management"),
    ("Washrooms near the canteen are never cleaned", "Facilities", "Medium", "Non-Technical", "Facilities Management"),
    ("Water leaking from the ceiling of the classroom", "Facilities", "High", "Non-Technical", "Facilities Management"),
    ("Broken chairs and tables in the classroom", "Facilities", "Low", "Non-Technical", "Facilities Management"),
    ("Hostel food quality is very poor", "Hostel", "Medium", "Non-Technical", "Hostel Office"),
    ("Hostel rooms are overcrowded and noisy at night", "Hostel", "Low", "Non-Technical", "Hostel Office"),
    ("Exam results were published late", "Academic", "Medium", "Non-Technical", "Academic Office"),
    ("Professor does not follow the course syllabus", "Academic", "Low", "Non-Technical", "Academic Office"),
    ("Exam timetable clashes with another course exam", "Academic", "High", "Non-Technical", "Academic Office"),
    ("Attendance records are wrong for the semester", "Academic", "Medium", "Non-Technical", "Academic Office"),
    ("Scholarship fees refund is delayed again", "Administrative", "High", "Non-Technical", "Accounts"),
    ("Fee receipt shows the wrong amount", "Administrative", "Medium", "Non-Technical", "Accounts"),
    ("Bike stolen from the campus parking area", "Security", "High", "Non-Technical", "Security"),
    ("Security guards absent at the main gate at night", "Security", "High", "Non-Technical", "Security"),
    ("Office staff was rude and ignored my request", "Staff Behaviour", "Low", "Non-Technical", "Human Resources"),
    ("Clerk at the admin office behaves unprofessionally", "Staff Behaviour", "Medium", "Non-Technical", "Human Resources"),
];

pub fn fixture_rows() -> Vec<TrainingRow> {
    ROWS.iter()
        .map(|(text, category, priority, complaint_type, department)| TrainingRow {
            complaint_text: text.to_string(),
            category: category.to_string(),
            priority: priority.to_string(),
            complaint_type: complaint_type.to_string(),
            department: department.to_string(),
        })
        .collect()
}

pub fn fixture_context() -> InferenceContext {
    fit_context(&fixture_rows()).expect("el corpus de prueba debe entrenar")
}

pub fn fixture_analyzer() -> ComplaintAnalyzer {
    ComplaintAnalyzer::new(
        ModelState::Ready(Arc::new(fixture_context())),
        Some(SentimentScorer::new()),
        DEFAULT_MAX_COMPLAINT_CHARS,
    )
}
