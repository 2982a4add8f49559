diesel::table! {
    devices (name) {
        name -> Text,
        timestamp -> BigInt,
        ch0_t -> Nullable<Float>,
        ch0_rh -> Nullable<Float>,
        ch1_t -> Nullable<Float>,
        ch1_rh -> Nullable<Float>,
        vsol -> Nullable<Float>,
        vbat -> Nullable<Float>,
        isol -> Nullable<Float>,
        ibat -> Nullable<Float>,
        is_charging -> Nullable<Bool>,
        pgood -> Nullable<Bool>,
        gps -> Nullable<Text>,
        last_image -> Nullable<Text>,
        pollen_count -> Nullable<BigInt>,
        detections -> Nullable<Text>,
    }
}

diesel::table! {
    history (id) {
        id -> Integer,
        name -> Text,
        timestamp -> BigInt,
        ch0_t -> Nullable<Float>,
        ch0_rh -> Nullable<Float>,
        ch1_t -> Nullable<Float>,
        ch1_rh -> Nullable<Float>,
        vsol -> Nullable<Float>,
        vbat -> Nullable<Float>,
        isol -> Nullable<Float>,
        ibat -> Nullable<Float>,
        is_charging -> Nullable<Bool>,
        pgood -> Nullable<Bool>,
        gps -> Nullable<Text>,
        image -> Nullable<Text>,
        pollen_count -> Nullable<BigInt>,
        detections -> Nullable<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(devices, history);
