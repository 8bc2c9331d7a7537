pub mod access {
    pub mod access_decision;
    pub mod access_decision_engine;
}

pub mod config;

pub mod detection {
    pub mod domain {
        pub mod face_detector;
    }
    pub mod infrastructure;
}

pub mod door {
    pub mod domain {
        pub mod door_command;
        pub mod serial_channel;
    }
    pub mod door_actuator;
    pub mod infrastructure;
}

pub mod identity {
    pub mod domain {
        pub mod identity_classifier;
        pub mod identity_labels;
    }
    pub mod infrastructure;
}

pub mod lifecycle {
    pub mod component_factory;
    pub mod door_controller;
    pub mod session_slot;
}

pub mod overlay {
    pub mod annotator;
    pub mod bitmap_font;
}

pub mod pipeline {
    pub mod frame_pipeline;
    pub mod pipeline_logger;
}

pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod frame;
}

pub mod streaming {
    pub mod frame_streamer;
    pub mod multipart;
}

pub mod video {
    pub mod domain {
        pub mod frame_encoder;
        pub mod frame_source;
    }
    pub mod infrastructure;
}

#[cfg(test)]
pub(crate) mod test_support;
