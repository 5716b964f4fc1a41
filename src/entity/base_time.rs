use chrono::{DateTime, Utc};

/// `created_at`/`updated_at` 을 가진 ActiveModel 공통 동작.
///
/// `ActiveModelBehavior::before_save` 에서 호출되므로 모든 insert/update 가
/// `updated_at` 을 갱신한다. 핸들러나 서비스 코드는 이 값을 직접 건드리지 않는다.
pub trait Timestamped {
    fn set_created_at(&mut self, dt: DateTime<Utc>);
    fn set_updated_at(&mut self, dt: DateTime<Utc>);

    fn stamp(mut self, insert: bool) -> Self
    where
        Self: Sized,
    {
        let now = Utc::now();
        if insert {
            self.set_created_at(now);
        }
        self.set_updated_at(now);
        self
    }
}
