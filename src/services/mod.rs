pub(crate) mod exam_player;
pub(crate) mod grading_client;
pub(crate) mod retake_policy;
pub(crate) mod session_launcher;
pub(crate) mod shuffle;
